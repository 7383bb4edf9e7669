//! Nodes, elements and models.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::keys::{Key, KeyIndex};
use super::range::AddressRange;
use crate::core::ModelError;

/// Model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// Bluetooth SIG defined model.
    Sig(u16),
    /// Vendor model.
    Vendor {
        /// Company identifier.
        company_id: u16,
        /// Vendor assigned model id.
        model_id: u16,
    },
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelId::Sig(id) => write!(f, "0x{id:04X}"),
            ModelId::Vendor {
                company_id,
                model_id,
            } => write!(f, "0x{company_id:04X}:0x{model_id:04X}"),
        }
    }
}

/// Publication settings of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publish {
    /// Publication address.
    pub address: Address,
    /// Application key used to publish.
    pub app_key_index: KeyIndex,
    /// TTL of published messages.
    pub ttl: u8,
}

/// A model inside an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    id: ModelId,
    #[serde(default)]
    pub(crate) bound_application_keys: Vec<KeyIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) publish: Option<Publish>,
    #[serde(default)]
    pub(crate) subscriptions: Vec<Address>,
}

impl Model {
    /// A model with no bindings.
    pub fn new(id: ModelId) -> Self {
        Self {
            id,
            bound_application_keys: Vec::new(),
            publish: None,
            subscriptions: Vec::new(),
        }
    }

    /// Model identifier.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Indexes of application keys bound to this model.
    pub fn bound_application_keys(&self) -> &[KeyIndex] {
        &self.bound_application_keys
    }

    /// Whether `index` is bound to this model.
    pub fn is_bound_to(&self, index: KeyIndex) -> bool {
        self.bound_application_keys.contains(&index)
    }

    /// Publication settings.
    pub fn publish(&self) -> Option<&Publish> {
        self.publish.as_ref()
    }

    /// Set or clear publication.
    pub fn set_publish(&mut self, publish: Option<Publish>) {
        self.publish = publish;
    }

    /// Subscribed addresses.
    pub fn subscriptions(&self) -> &[Address] {
        &self.subscriptions
    }

    /// Subscribe to a group or virtual address.
    pub fn subscribe(&mut self, address: Address) {
        if !self.subscriptions.contains(&address) {
            self.subscriptions.push(address);
        }
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, address: Address) {
        self.subscriptions.retain(|a| *a != address);
    }
}

/// An addressable element of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(default)]
    pub(crate) index: u8,
    #[serde(default)]
    location: u16,
    #[serde(default)]
    pub(crate) models: Vec<Model>,
}

impl Element {
    /// An element at GATT location `location` with the given models.
    pub fn new(location: u16, models: Vec<Model>) -> Self {
        Self {
            index: 0,
            location,
            models,
        }
    }

    /// Index within the node.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// GATT namespace location descriptor.
    pub fn location(&self) -> u16 {
        self.location
    }

    /// Models of this element.
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Model with the given id.
    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    pub(crate) fn model_mut(&mut self, id: ModelId) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.id == id)
    }
}

/// A provisioned node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    uuid: Uuid,
    name: String,
    unicast_address: Address,
    device_key: Key,
    pub(crate) elements: Vec<Element>,
    #[serde(default)]
    pub(crate) network_keys: Vec<KeyIndex>,
    #[serde(default)]
    pub(crate) application_keys: Vec<KeyIndex>,
}

impl Node {
    /// A node with `element_count` empty elements and a random device key.
    pub fn new(name: impl Into<String>, unicast_address: Address, element_count: u8) -> Self {
        let elements = (0..element_count)
            .map(|_| Element::new(0, Vec::new()))
            .collect();
        Self::with_elements(name, unicast_address, elements)
    }

    /// A node with the given elements; element indexes are renumbered.
    pub fn with_elements(
        name: impl Into<String>,
        unicast_address: Address,
        elements: Vec<Element>,
    ) -> Self {
        let mut node = Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            unicast_address,
            device_key: Key::random(),
            elements,
            network_keys: Vec::new(),
            application_keys: Vec::new(),
        };
        node.renumber_elements();
        node
    }

    /// Replace the UUID.
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// Replace the device key.
    pub fn with_device_key(mut self, key: Key) -> Self {
        self.device_key = key;
        self
    }

    /// Set the known network and application keys.
    pub fn with_keys(mut self, network_keys: Vec<KeyIndex>, application_keys: Vec<KeyIndex>) -> Self {
        self.network_keys = network_keys;
        self.application_keys = application_keys;
        self
    }

    pub(crate) fn renumber_elements(&mut self) {
        for (i, element) in self.elements.iter_mut().enumerate() {
            element.index = i as u8;
        }
    }

    pub(crate) fn set_unicast_address(&mut self, address: Address) {
        self.unicast_address = address;
    }

    /// Node UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the primary element.
    pub fn unicast_address(&self) -> Address {
        self.unicast_address
    }

    /// Device key.
    pub fn device_key(&self) -> &Key {
        &self.device_key
    }

    /// Elements in index order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Address of the last element, or `None` if the span overflows 16 bits.
    pub fn last_address(&self) -> Option<Address> {
        let count = u16::try_from(self.elements.len()).ok()?;
        self.unicast_address.checked_add(count.checked_sub(1)?)
    }

    /// Addresses occupied by this node.
    pub fn address_range(&self) -> Result<AddressRange, ModelError> {
        let last = self.last_address().ok_or(ModelError::SpanOutOfBounds {
            address: self.unicast_address.value(),
            element_count: self.elements.len(),
        })?;
        AddressRange::new(self.unicast_address.value(), last.value())
    }

    /// Whether `address` belongs to one of this node's elements.
    pub fn contains_address(&self, address: Address) -> bool {
        self.address_range()
            .map(|range| range.contains(address.value()))
            .unwrap_or(false)
    }

    /// Element with the given address.
    pub fn element_with_address(&self, address: Address) -> Option<&Element> {
        let offset = address.value().checked_sub(self.unicast_address.value())?;
        self.elements.get(usize::from(offset))
    }

    pub(crate) fn element_with_address_mut(&mut self, address: Address) -> Option<&mut Element> {
        let offset = address.value().checked_sub(self.unicast_address.value())?;
        self.elements.get_mut(usize::from(offset))
    }

    /// Address of the element at `index`.
    pub fn element_address(&self, index: u8) -> Option<Address> {
        if usize::from(index) >= self.elements.len() {
            return None;
        }
        self.unicast_address.checked_add(u16::from(index))
    }

    /// Known network key indexes.
    pub fn network_keys(&self) -> &[KeyIndex] {
        &self.network_keys
    }

    /// Known application key indexes.
    pub fn application_keys(&self) -> &[KeyIndex] {
        &self.application_keys
    }

    /// Whether the node knows the network key.
    pub fn knows_network_key(&self, index: KeyIndex) -> bool {
        self.network_keys.contains(&index)
    }

    /// Whether the node knows the application key.
    pub fn knows_application_key(&self, index: KeyIndex) -> bool {
        self.application_keys.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_span() {
        let node = Node::new("light", Address::new(0x10), 3);
        assert_eq!(node.last_address(), Some(Address::new(0x12)));
        assert!(node.contains_address(Address::new(0x11)));
        assert!(!node.contains_address(Address::new(0x13)));
        assert_eq!(node.element_address(2), Some(Address::new(0x12)));
        assert_eq!(node.element_address(3), None);
    }

    #[test]
    fn test_node_without_elements_has_no_span() {
        let node = Node::new("empty", Address::new(0x10), 0);
        assert_eq!(node.last_address(), None);
        assert!(node.address_range().is_err());
    }

    #[test]
    fn test_element_lookup_by_address() {
        let elements = vec![
            Element::new(1, vec![Model::new(ModelId::Sig(0x1000))]),
            Element::new(2, vec![Model::new(ModelId::Sig(0x1300))]),
        ];
        let node = Node::with_elements("lamp", Address::new(0x20), elements);

        let second = node.element_with_address(Address::new(0x21)).unwrap();
        assert_eq!(second.index(), 1);
        assert!(second.model(ModelId::Sig(0x1300)).is_some());
        assert!(node.element_with_address(Address::new(0x1F)).is_none());
        assert!(node.element_with_address(Address::new(0x22)).is_none());
    }

    #[test]
    fn test_model_subscriptions() {
        let mut model = Model::new(ModelId::Vendor {
            company_id: 0x0059,
            model_id: 1,
        });
        model.subscribe(Address::new(0xC001));
        model.subscribe(Address::new(0xC001));
        assert_eq!(model.subscriptions().len(), 1);
        model.unsubscribe(Address::new(0xC001));
        assert!(model.subscriptions().is_empty());
        assert_eq!(model.id().to_string(), "0x0059:0x0001");
    }
}
