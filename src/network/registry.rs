//! Key and binding queries over the network model.

use super::address::Address;
use super::keys::{ApplicationKey, KeyIndex};
use super::mesh::MeshNetwork;
use super::node::{ModelId, Node};
use crate::core::ModelError;

/// A reference to either kind of key, for membership queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef {
    /// Network key index.
    Network(KeyIndex),
    /// Application key index.
    Application(KeyIndex),
}

impl MeshNetwork {
    /// Check that `app` is, or can be, bound to `net`.
    ///
    /// The binding is fixed when the application key is created, so this
    /// succeeds only if it already points at `net`.
    pub fn bind_application_key(&self, app: KeyIndex, net: KeyIndex) -> Result<(), ModelError> {
        if self.network_key(net).is_none() {
            return Err(ModelError::UnknownNetworkKey(net));
        }
        let key = self
            .application_key(app)
            .ok_or(ModelError::UnknownApplicationKey(app))?;
        if key.bound_network_key() != net {
            return Err(ModelError::KeyAlreadyBound {
                app_key: app,
                bound_to: key.bound_network_key(),
            });
        }
        Ok(())
    }

    /// Whether the node at `node` knows `key`.
    pub fn node_knows(&self, node: Address, key: KeyRef) -> bool {
        self.node(node).is_some_and(|n| match key {
            KeyRef::Network(index) => n.knows_network_key(index),
            KeyRef::Application(index) => n.knows_application_key(index),
        })
    }

    /// Application keys the node knows that can still be bound to a model.
    ///
    /// Keys whose bound network key the node does not know are skipped, as
    /// are keys already bound to the model. Order is insertion order.
    pub fn available_application_keys(
        &self,
        node: Address,
        element: Address,
        model: ModelId,
    ) -> Result<Vec<&ApplicationKey>, ModelError> {
        let owner = self.node(node).ok_or(ModelError::UnknownNode(node.value()))?;
        let model = owner
            .element_with_address(element)
            .ok_or(ModelError::UnknownElement(element.value()))?
            .model(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;

        Ok(self
            .application_keys()
            .iter()
            .filter(|k| owner.knows_application_key(k.index()))
            .filter(|k| owner.knows_network_key(k.bound_network_key()))
            .filter(|k| !model.is_bound_to(k.index()))
            .collect())
    }

    /// Application keys the node does not know yet but could be sent.
    pub fn application_keys_addable_to(
        &self,
        node: Address,
    ) -> Result<Vec<&ApplicationKey>, ModelError> {
        let owner = self.node(node).ok_or(ModelError::UnknownNode(node.value()))?;
        Ok(self
            .application_keys()
            .iter()
            .filter(|k| !owner.knows_application_key(k.index()))
            .filter(|k| owner.knows_network_key(k.bound_network_key()))
            .collect())
    }

    /// Check that `node` can be sent application key `app` under network
    /// key `net`: the binding matches and the key is addable to the node.
    pub fn check_application_key_add(
        &self,
        node: Address,
        net: KeyIndex,
        app: KeyIndex,
    ) -> Result<(), ModelError> {
        self.bind_application_key(app, net)?;
        if self
            .application_keys_addable_to(node)?
            .iter()
            .any(|k| k.index() == app)
        {
            return Ok(());
        }
        let owner = self.node(node).ok_or(ModelError::UnknownNode(node.value()))?;
        if owner.knows_application_key(app) {
            Err(ModelError::ApplicationKeyAlreadyKnown {
                node: owner.unicast_address().value(),
                app_key: app,
            })
        } else {
            Err(ModelError::NetworkKeyNotKnown {
                node: owner.unicast_address().value(),
                net_key: net,
            })
        }
    }

    /// Check that `app` is available for binding to `model` on the element
    /// at `element`.
    pub fn check_model_bind(
        &self,
        element: Address,
        model: ModelId,
        app: KeyIndex,
    ) -> Result<(), ModelError> {
        let key = self
            .application_key(app)
            .ok_or(ModelError::UnknownApplicationKey(app))?;
        if self
            .available_application_keys(element, element, model)?
            .iter()
            .any(|k| k.index() == app)
        {
            return Ok(());
        }
        let owner = self
            .node(element)
            .ok_or(ModelError::UnknownNode(element.value()))?;
        let node = owner.unicast_address().value();
        if !owner.knows_application_key(app) {
            Err(ModelError::ApplicationKeyNotKnown { node, app_key: app })
        } else if !owner.knows_network_key(key.bound_network_key()) {
            Err(ModelError::NetworkKeyNotKnown {
                node,
                net_key: key.bound_network_key(),
            })
        } else {
            Err(ModelError::ModelAlreadyBound {
                element: element.value(),
                app_key: app,
            })
        }
    }

    /// Record that the node knows a network key.
    pub fn node_add_network_key(&mut self, node: Address, net: KeyIndex) -> Result<(), ModelError> {
        if self.network_key(net).is_none() {
            return Err(ModelError::UnknownNetworkKey(net));
        }
        let owner = self.require_node_mut(node)?;
        if !owner.knows_network_key(net) {
            owner.network_keys.push(net);
        }
        Ok(())
    }

    /// Record that the node knows an application key.
    pub fn node_add_application_key(&mut self, node: Address, app: KeyIndex) -> Result<(), ModelError> {
        let bound = self
            .application_key(app)
            .ok_or(ModelError::UnknownApplicationKey(app))?
            .bound_network_key();
        let owner = self.require_node_mut(node)?;
        if !owner.knows_network_key(bound) {
            return Err(ModelError::NetworkKeyNotKnown {
                node: owner.unicast_address().value(),
                net_key: bound,
            });
        }
        if !owner.knows_application_key(app) {
            owner.application_keys.push(app);
        }
        Ok(())
    }

    /// Record that the node forgot an application key, unbinding it everywhere.
    pub fn node_remove_application_key(&mut self, node: Address, app: KeyIndex) -> Result<(), ModelError> {
        let owner = self.require_node_mut(node)?;
        owner.application_keys.retain(|&k| k != app);
        for model in owner.elements.iter_mut().flat_map(|e| e.models.iter_mut()) {
            model.bound_application_keys.retain(|&k| k != app);
        }
        Ok(())
    }

    /// Bind an application key the node knows to one of its models.
    pub fn model_bind_application_key(
        &mut self,
        element: Address,
        model: ModelId,
        app: KeyIndex,
    ) -> Result<(), ModelError> {
        if self.application_key(app).is_none() {
            return Err(ModelError::UnknownApplicationKey(app));
        }
        let owner = self.require_node_mut(element)?;
        if !owner.knows_application_key(app) {
            return Err(ModelError::ApplicationKeyNotKnown {
                node: owner.unicast_address().value(),
                app_key: app,
            });
        }
        let target = owner
            .element_with_address_mut(element)
            .ok_or(ModelError::UnknownElement(element.value()))?
            .model_mut(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;
        if !target.is_bound_to(app) {
            target.bound_application_keys.push(app);
        }
        Ok(())
    }

    /// Remove a binding from a model.
    pub fn model_unbind_application_key(
        &mut self,
        element: Address,
        model: ModelId,
        app: KeyIndex,
    ) -> Result<(), ModelError> {
        let owner = self.require_node_mut(element)?;
        let target = owner
            .element_with_address_mut(element)
            .ok_or(ModelError::UnknownElement(element.value()))?
            .model_mut(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))?;
        target.bound_application_keys.retain(|&k| k != app);
        Ok(())
    }

    fn require_node_mut(&mut self, address: Address) -> Result<&mut Node, ModelError> {
        self.node_mut(address)
            .ok_or(ModelError::UnknownNode(address.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::keys::NetworkKey;
    use crate::network::node::{Element, Model};

    const LIGHT: ModelId = ModelId::Sig(0x1000);

    /// Net keys 0, 1; app keys 0 -> net 0, 1 -> net 1, 2 -> net 0.
    /// Node 0x0010 knows net 0 and app keys 0 and 2.
    fn network() -> MeshNetwork {
        let mut network = MeshNetwork::new("home");
        for net in 0..2 {
            network
                .add_network_key(NetworkKey::generate(net, format!("net {net}")).unwrap())
                .unwrap();
        }
        for (app, net) in [(0, 0), (1, 1), (2, 0)] {
            network
                .add_application_key(ApplicationKey::generate(app, format!("app {app}"), net).unwrap())
                .unwrap();
        }
        let elements = vec![
            Element::new(0, vec![Model::new(LIGHT)]),
            Element::new(0, vec![Model::new(ModelId::Sig(0x1300))]),
        ];
        let node = Node::with_elements("lamp", Address::new(0x10), elements).with_keys(vec![0], vec![0, 2]);
        network.add_node(node).unwrap();
        network
    }

    fn indexes(keys: Vec<&ApplicationKey>) -> Vec<KeyIndex> {
        keys.into_iter().map(|k| k.index()).collect()
    }

    #[test]
    fn test_bind_application_key() {
        let network = network();
        assert_eq!(network.bind_application_key(0, 0), Ok(()));
        assert_eq!(
            network.bind_application_key(0, 1),
            Err(ModelError::KeyAlreadyBound {
                app_key: 0,
                bound_to: 0
            })
        );
        assert_eq!(
            network.bind_application_key(0, 9),
            Err(ModelError::UnknownNetworkKey(9))
        );
    }

    #[test]
    fn test_node_knows() {
        let network = network();
        let node = Address::new(0x10);
        assert!(network.node_knows(node, KeyRef::Network(0)));
        assert!(!network.node_knows(node, KeyRef::Network(1)));
        assert!(network.node_knows(node, KeyRef::Application(2)));
        assert!(!network.node_knows(Address::new(0x99), KeyRef::Network(0)));
    }

    #[test]
    fn test_available_application_keys() {
        let mut network = network();
        let node = Address::new(0x10);

        let available = network.available_application_keys(node, node, LIGHT).unwrap();
        assert_eq!(indexes(available), vec![0, 2]);

        network.model_bind_application_key(node, LIGHT, 0).unwrap();
        let available = network.available_application_keys(node, node, LIGHT).unwrap();
        assert_eq!(indexes(available), vec![2]);

        assert_eq!(
            network.available_application_keys(node, Address::new(0x11), LIGHT),
            Err(ModelError::UnknownModel("0x1000".into()))
        );
    }

    #[test]
    fn test_application_keys_addable_to() {
        let mut network = network();
        let node = Address::new(0x10);
        assert!(network.application_keys_addable_to(node).unwrap().is_empty());

        network.node_add_network_key(node, 1).unwrap();
        assert_eq!(indexes(network.application_keys_addable_to(node).unwrap()), vec![1]);
    }

    #[test]
    fn test_check_application_key_add() {
        let network = network();
        let node = Address::new(0x10);
        assert_eq!(
            network.check_application_key_add(node, 1, 1),
            Err(ModelError::NetworkKeyNotKnown {
                node: 0x10,
                net_key: 1
            })
        );
        assert_eq!(
            network.check_application_key_add(node, 0, 2),
            Err(ModelError::ApplicationKeyAlreadyKnown {
                node: 0x10,
                app_key: 2
            })
        );
        assert_eq!(
            network.check_application_key_add(node, 0, 1),
            Err(ModelError::KeyAlreadyBound {
                app_key: 1,
                bound_to: 1
            })
        );
        assert_eq!(
            network.check_application_key_add(Address::new(0x99), 0, 0),
            Err(ModelError::UnknownNode(0x99))
        );
    }

    #[test]
    fn test_check_model_bind() {
        let mut network = network();
        let node = Address::new(0x10);
        assert_eq!(network.check_model_bind(node, LIGHT, 0), Ok(()));
        assert_eq!(
            network.check_model_bind(node, LIGHT, 1),
            Err(ModelError::ApplicationKeyNotKnown {
                node: 0x10,
                app_key: 1
            })
        );
        network.model_bind_application_key(node, LIGHT, 0).unwrap();
        assert_eq!(
            network.check_model_bind(node, LIGHT, 0),
            Err(ModelError::ModelAlreadyBound {
                element: 0x10,
                app_key: 0
            })
        );
        assert_eq!(
            network.check_model_bind(node, LIGHT, 9),
            Err(ModelError::UnknownApplicationKey(9))
        );
    }

    #[test]
    fn test_node_add_application_key_requires_network_key() {
        let mut network = network();
        let node = Address::new(0x10);
        assert_eq!(
            network.node_add_application_key(node, 1),
            Err(ModelError::NetworkKeyNotKnown {
                node: 0x10,
                net_key: 1
            })
        );
        network.node_add_network_key(node, 1).unwrap();
        network.node_add_application_key(node, 1).unwrap();
        assert!(network.node_knows(node, KeyRef::Application(1)));
    }

    #[test]
    fn test_model_bind_requires_known_key() {
        let mut network = network();
        let node = Address::new(0x10);
        assert_eq!(
            network.model_bind_application_key(node, LIGHT, 1),
            Err(ModelError::ApplicationKeyNotKnown {
                node: 0x10,
                app_key: 1
            })
        );
        network.model_bind_application_key(node, LIGHT, 2).unwrap();
        network.model_bind_application_key(node, LIGHT, 2).unwrap();
        let model = network.element(node).unwrap().model(LIGHT).unwrap();
        assert_eq!(model.bound_application_keys(), &[2]);

        network.model_unbind_application_key(node, LIGHT, 2).unwrap();
        let model = network.element(node).unwrap().model(LIGHT).unwrap();
        assert!(model.bound_application_keys().is_empty());
    }

    #[test]
    fn test_node_remove_application_key_unbinds() {
        let mut network = network();
        let node = Address::new(0x10);
        network.model_bind_application_key(node, LIGHT, 0).unwrap();
        network.node_remove_application_key(node, 0).unwrap();
        assert!(!network.node_knows(node, KeyRef::Application(0)));
        let model = network.element(node).unwrap().model(LIGHT).unwrap();
        assert!(model.bound_application_keys().is_empty());
    }
}
