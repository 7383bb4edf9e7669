//! Outgoing exchange tasks.
//!
//! Every PDU is built and handed to the bearer while holding the transmit
//! lock, so sequence numbers reach the bearer in increasing order and the
//! segments of one round go out back to back.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::handle::{ExchangeResult, Signal};
use super::manager::Shared;
use crate::core::{MeshMessage, SendError};
use crate::crypto::NetworkKeyMaterial;
use crate::network::Address;
use crate::transport::{
    AccessKey, AckOutcome, ExchangeState, LowerTransportPdu, NetworkPdu, SegmentAck,
    SegmentedExchange, TimerOutcome, TransportError, UpperContext, encrypt_access,
    requires_segmentation, segment,
};

/// Everything needed to send one message, resolved from the network
/// before the task starts.
#[derive(Debug)]
pub(super) struct Outgoing {
    pub(super) message: Arc<dyn MeshMessage>,
    pub(super) access_pdu: Vec<u8>,
    pub(super) src: Address,
    pub(super) dst: Address,
    pub(super) label: Option<Uuid>,
    pub(super) ttl: u8,
    pub(super) iv_index: u32,
    pub(super) network_key: NetworkKeyMaterial,
    pub(super) access_key: AccessKey,
    pub(super) response_opcode: Option<u32>,
}

impl Outgoing {
    fn network_pdu(&self, seq: u32, lower: &LowerTransportPdu) -> NetworkPdu {
        NetworkPdu {
            ctl: lower.is_control(),
            ttl: self.ttl,
            seq,
            src: self.src,
            dst: self.dst,
            transport_pdu: lower.encode(),
        }
    }
}

pub(super) fn send_error(error: TransportError) -> SendError {
    match error {
        TransportError::Bearer(e) => SendError::BearerUnavailable(e),
        TransportError::Crypto(e) => SendError::Crypto(e),
        TransportError::SequenceExhausted => SendError::SequenceExhausted,
        other => SendError::Encoding(other.to_string()),
    }
}

impl Shared {
    /// Seal a PDU and hand it to the bearer.
    fn emit(
        &self,
        network_key: &NetworkKeyMaterial,
        iv_index: u32,
        pdu: &NetworkPdu,
    ) -> Result<(), TransportError> {
        let raw = pdu.encode(network_key, iv_index)?;
        self.bearer.send(&raw)?;
        Ok(())
    }

    /// Send one control or access PDU built around a fresh sequence number.
    pub(super) fn transmit<F>(
        &self,
        network_key: &NetworkKeyMaterial,
        iv_index: u32,
        build: F,
    ) -> Result<u32, TransportError>
    where
        F: FnOnce(u32) -> NetworkPdu,
    {
        let _guard = self.transmit_lock.lock();
        let seq = self.sequence.next()?;
        self.emit(network_key, iv_index, &build(seq))?;
        Ok(seq)
    }

    /// Send an unsegmented message, or the first round of a segmented one.
    fn transmit_message(
        &self,
        job: &Outgoing,
    ) -> Result<Option<SegmentedExchange>, TransportError> {
        let _guard = self.transmit_lock.lock();
        let seq_auth = self.sequence.next()?;
        let ctx = UpperContext {
            seq_auth,
            src: job.src,
            dst: job.dst,
            iv_index: job.iv_index,
            label: job.label.as_ref(),
        };
        let upper_pdu = encrypt_access(&job.access_pdu, &job.access_key, &ctx)?;
        let (akf, aid) = (job.access_key.akf(), job.access_key.aid());

        if !requires_segmentation(job.access_pdu.len()) {
            let lower = LowerTransportPdu::UnsegmentedAccess {
                akf,
                aid,
                upper_pdu,
            };
            self.emit(&job.network_key, job.iv_index, &job.network_pdu(seq_auth, &lower))?;
            return Ok(None);
        }

        let segments = segment(akf, aid, seq_auth, &upper_pdu)?;
        let mut exchange = SegmentedExchange::new(
            job.dst,
            seq_auth,
            segments,
            self.config.retransmit_policy(job.ttl),
        );
        for (i, seg) in exchange.start().iter().enumerate() {
            let seq = if i == 0 { seq_auth } else { self.sequence.next()? };
            let lower = LowerTransportPdu::SegmentedAccess(seg.clone());
            self.emit(&job.network_key, job.iv_index, &job.network_pdu(seq, &lower))?;
        }
        exchange.first_round_sent();
        Ok(Some(exchange))
    }

    /// Resend every segment the destination has not acknowledged.
    fn retransmit(&self, job: &Outgoing, exchange: &SegmentedExchange) -> Result<(), TransportError> {
        let _guard = self.transmit_lock.lock();
        for seg in exchange.unacked() {
            let seq = self.sequence.next()?;
            let lower = LowerTransportPdu::SegmentedAccess(seg.clone());
            self.emit(&job.network_key, job.iv_index, &job.network_pdu(seq, &lower))?;
        }
        Ok(())
    }

    /// Send a segment acknowledgment from `src` to `dst`.
    pub(super) fn send_segment_ack(
        &self,
        network_key: &NetworkKeyMaterial,
        iv_index: u32,
        src: Address,
        dst: Address,
        seq_zero: u16,
        block_ack: u32,
    ) {
        let lower = LowerTransportPdu::SegmentAck(SegmentAck {
            obo: false,
            seq_zero,
            block_ack,
        });
        let result = self.transmit(network_key, iv_index, |seq| NetworkPdu {
            ctl: true,
            ttl: self.config.default_ttl,
            seq,
            src,
            dst,
            transport_pdu: lower.encode(),
        });
        match result {
            Ok(_) => tracing::trace!("acked {block_ack:#010x} for seq zero {seq_zero} to {dst}"),
            Err(e) => tracing::warn!("segment ack to {dst} failed: {e}"),
        }
    }
}

/// Resolve when the exchange is cancelled or every sender is gone.
async fn cancelled(signals: &mut mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        if matches!(signal, Signal::Cancel) {
            return;
        }
    }
}

/// Drive one exchange to completion.
pub(super) async fn run(
    shared: &Shared,
    job: Outgoing,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    state: &watch::Sender<ExchangeState>,
) -> ExchangeResult {
    let destination = job.dst;
    let segmented = requires_segmentation(job.access_pdu.len());

    // One segmented exchange per destination at a time.
    let turn = if segmented {
        let lock = shared.destination_lock(destination);
        tokio::select! {
            guard = lock.lock_owned() => Some(guard),
            _ = cancelled(&mut signals) => return Err(SendError::Cancelled),
        }
    } else {
        None
    };

    if segmented {
        state.send_replace(ExchangeState::Segmenting);
    }
    let exchange = shared.transmit_message(&job).map_err(send_error)?;

    let mut early_response = None;
    if let Some(mut exchange) = exchange {
        state.send_replace(exchange.state());
        tracing::debug!(
            "sent {} segments to {destination}, seq auth {:#08x}",
            exchange.unacked().count(),
            exchange.seq_auth()
        );
        while exchange.state() == ExchangeState::AwaitingAck {
            tokio::select! {
                _ = tokio::time::sleep(exchange.interval()) => match exchange.on_timer() {
                    TimerOutcome::Retransmit => {
                        tracing::debug!("retransmitting to {destination}, round {}", exchange.rounds());
                        shared.retransmit(&job, &exchange).map_err(send_error)?;
                    }
                    TimerOutcome::Exhausted => {
                        return Err(SendError::RetransmissionLimitExceeded {
                            destination: destination.value(),
                        });
                    }
                },
                signal = signals.recv() => match signal {
                    Some(Signal::SegmentAck(ack)) => match exchange.on_ack(&ack) {
                        AckOutcome::Complete | AckOutcome::Ignored => {}
                        AckOutcome::Busy => {
                            return Err(SendError::RemoteBusy {
                                destination: destination.value(),
                            });
                        }
                        AckOutcome::Partial { missing } => {
                            tracing::debug!("{destination} is missing segments {missing:#010x}");
                            shared.retransmit(&job, &exchange).map_err(send_error)?;
                        }
                    },
                    Some(Signal::Response(message)) => early_response = Some(message),
                    Some(Signal::Cancel) | None => return Err(SendError::Cancelled),
                },
            }
        }
    }
    drop(turn);

    shared
        .delegate
        .on_message_sent(job.message.clone(), job.src, destination);

    let Some(response_opcode) = job.response_opcode else {
        state.send_replace(ExchangeState::Completed);
        return Ok(None);
    };
    if let Some(message) = early_response {
        return Ok(Some(message));
    }

    state.send_replace(ExchangeState::AwaitingAck);
    let deadline = tokio::time::sleep(shared.config.acknowledgment_message_timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                return Err(SendError::ResponseTimeout {
                    destination: destination.value(),
                    response_opcode,
                });
            }
            signal = signals.recv() => match signal {
                Some(Signal::Response(message)) => return Ok(Some(message)),
                Some(Signal::SegmentAck(_)) => {}
                Some(Signal::Cancel) | None => return Err(SendError::Cancelled),
            },
        }
    }
}
