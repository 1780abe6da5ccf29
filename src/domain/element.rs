//! Element tree representation of a resource
//!
//! The anonymization engine never walks raw JSON. A [`Resource`] is converted
//! into a tree of [`ElementNode`]s where every JSON field becomes a named node,
//! repeated fields become same-named siblings, and primitives carry their JSON
//! value. Nodes are addressed by child-index paths (`&[usize]`) while a rule is
//! being applied; human-readable locations such as `Patient.name[0].given[1]`
//! are derived from those paths for logs and errors.
//!
//! Converting back drops every node left with neither a value nor children.
//! This is how a redacted element disappears from the output.

use super::errors::CloakError;
use super::resource::Resource;
use super::result::Result;
use serde_json::{Map, Value};

/// Field name marking a resource root
pub const RESOURCE_TYPE_FIELD: &str = "resourceType";

/// One node of the element tree
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    name: String,
    value: Option<Value>,
    children: Vec<ElementNode>,
    is_array_item: bool,
}

impl ElementNode {
    /// Create an empty complex node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Vec::new(),
            is_array_item: false,
        }
    }

    /// Create a primitive node
    pub fn primitive(name: impl Into<String>, value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::new(name)
        }
    }

    /// Build the tree for a resource; the root node is named after its type
    pub fn from_resource(resource: &Resource) -> Self {
        let mut root = Self::new(resource.resource_type());
        for (field, value) in resource.as_map() {
            root.push_field(field, value);
        }
        root
    }

    /// Build a node (and its subtree) from an arbitrary JSON value
    pub fn from_json(name: impl Into<String>, value: &Value) -> Self {
        let mut node = Self::new(name);
        match value {
            Value::Object(map) => {
                for (field, child) in map {
                    node.push_field(field, child);
                }
            }
            other => node.value = Some(other.clone()),
        }
        node
    }

    fn push_field(&mut self, field: &str, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    let mut child = Self::from_json(field, item);
                    child.is_array_item = true;
                    self.children.push(child);
                }
            }
            other => self.children.push(Self::from_json(field, other)),
        }
    }

    /// Convert the tree back into a resource
    ///
    /// # Errors
    ///
    /// Returns a processing error when the transformed tree no longer forms a
    /// typed resource object
    pub fn to_resource(&self) -> Result<Resource> {
        match self.to_json() {
            Some(value @ Value::Object(_)) => Resource::from_value(value).map_err(|e| {
                CloakError::processing("TREE", format!("Transformed tree is not a resource: {e}"))
            }),
            _ => Err(CloakError::processing(
                "TREE",
                format!("Element '{}' no longer holds a resource object", self.name),
            )),
        }
    }

    /// Render this node as JSON; `None` when the node has been emptied
    pub fn to_json(&self) -> Option<Value> {
        if self.children.is_empty() {
            return self.value.clone();
        }

        let mut map = Map::new();
        let mut order: Vec<&str> = Vec::new();
        for child in &self.children {
            if !order.contains(&child.name.as_str()) {
                order.push(&child.name);
            }
        }

        for field in order {
            let same_name: Vec<&ElementNode> =
                self.children.iter().filter(|c| c.name == field).collect();
            let is_array = same_name.iter().any(|c| c.is_array_item);
            if is_array {
                let items: Vec<Value> = same_name.iter().filter_map(|c| c.to_json()).collect();
                if !items.is_empty() {
                    map.insert(field.to_string(), Value::Array(items));
                }
            } else if let Some(value) = same_name.last().and_then(|c| c.to_json()) {
                map.insert(field.to_string(), value);
            }
        }

        if map.is_empty() {
            None
        } else {
            Some(Value::Object(map))
        }
    }

    /// Node name (the JSON field name, or the resource type for a root)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primitive value, if any
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Primitive value as a string slice
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// Replace the primitive value
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Remove the value and every child
    pub fn clear(&mut self) {
        self.value = None;
        self.children.clear();
    }

    /// Replace the content of this node with another node's content,
    /// keeping this node's name and array membership
    pub fn replace_content(&mut self, other: ElementNode) {
        self.value = other.value;
        self.children = other.children;
    }

    /// Child nodes in document order
    pub fn children(&self) -> &[ElementNode] {
        &self.children
    }

    /// Mutable child nodes
    pub fn children_mut(&mut self) -> &mut Vec<ElementNode> {
        &mut self.children
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&ElementNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable first child with the given name
    pub fn child_mut(&mut self, name: &str) -> Option<&mut ElementNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Append a child node
    pub fn push_child(&mut self, child: ElementNode) {
        self.children.push(child);
    }

    /// Whether this node was produced from a JSON array entry
    pub fn is_array_item(&self) -> bool {
        self.is_array_item
    }

    /// Mark this node as an array entry
    pub fn set_array_item(&mut self, is_array_item: bool) {
        self.is_array_item = is_array_item;
    }

    /// A node without children
    pub fn is_primitive(&self) -> bool {
        self.children.is_empty()
    }

    /// A node with neither value nor children
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Resource type if this node is a resource root
    pub fn resource_type(&self) -> Option<&str> {
        self.child(RESOURCE_TYPE_FIELD)
            .and_then(|c| c.value_str())
            .filter(|rt| !rt.is_empty())
    }

    /// Logical id if this node is a resource root
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_type()?;
        self.child("id").and_then(|c| c.value_str())
    }

    /// Whether this node is the `resourceType` marker of a resource root
    pub fn is_resource_type_marker(&self) -> bool {
        self.name == RESOURCE_TYPE_FIELD && self.is_primitive()
    }

    /// Node at a child-index path
    pub fn get(&self, path: &[usize]) -> Option<&ElementNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Mutable node at a child-index path
    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut ElementNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Human-readable location of a child-index path, e.g. `Patient.name[0].family`
    pub fn location_of(&self, path: &[usize]) -> String {
        let mut location = self.name.clone();
        let mut node = self;
        for &index in path {
            let Some(child) = node.children.get(index) else {
                break;
            };
            location.push('.');
            location.push_str(&child.name);
            if child.is_array_item {
                let ordinal = node.children[..index]
                    .iter()
                    .filter(|c| c.name == child.name)
                    .count();
                location.push_str(&format!("[{ordinal}]"));
            }
            node = child;
        }
        location
    }

    /// Child-index paths of every resource root, pre-order, including this node
    pub fn resource_roots(&self) -> Vec<Vec<usize>> {
        let mut roots = Vec::new();
        let mut path = Vec::new();
        self.collect_resource_roots(&mut path, &mut roots);
        roots
    }

    fn collect_resource_roots(&self, path: &mut Vec<usize>, roots: &mut Vec<Vec<usize>>) {
        if self.resource_type().is_some() {
            roots.push(path.clone());
        }
        for (index, child) in self.children.iter().enumerate() {
            path.push(index);
            child.collect_resource_roots(path, roots);
            path.pop();
        }
    }

    /// Visit every primitive in this subtree (including this node)
    ///
    /// Stops at the first error returned by the visitor.
    pub fn try_for_each_primitive_mut<F>(&mut self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&mut ElementNode) -> Result<()>,
    {
        if self.children.is_empty() {
            if self.value.is_some() {
                visit(self)?;
            }
            return Ok(());
        }
        for child in &mut self.children {
            if child.is_resource_type_marker() {
                continue;
            }
            child.try_for_each_primitive_mut(visit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient() -> Resource {
        Resource::from_value(json!({
            "resourceType": "Patient",
            "id": "p1",
            "name": [
                {"family": "Chalmers", "given": ["Peter", "James"]},
                {"family": "Windsor"}
            ],
            "birthDate": "1974-12-25",
            "active": true
        }))
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_resource() {
        let resource = patient();
        let tree = ElementNode::from_resource(&resource);
        assert_eq!(tree.to_resource().unwrap(), resource);
    }

    #[test]
    fn test_root_is_named_after_resource_type() {
        let tree = ElementNode::from_resource(&patient());
        assert_eq!(tree.name(), "Patient");
        assert_eq!(tree.resource_type(), Some("Patient"));
        assert_eq!(tree.resource_id(), Some("p1"));
    }

    #[test]
    fn test_arrays_become_siblings() {
        let tree = ElementNode::from_resource(&patient());
        let names: Vec<&ElementNode> = tree
            .children()
            .iter()
            .filter(|c| c.name() == "name")
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.is_array_item()));
    }

    #[test]
    fn test_location_of() {
        let tree = ElementNode::from_resource(&patient());
        // resourceType, id, name, name, birthDate, active
        assert_eq!(tree.location_of(&[3, 0]), "Patient.name[1].family");
        assert_eq!(tree.location_of(&[2, 1]), "Patient.name[0].given[0]");
        assert_eq!(tree.location_of(&[2, 2]), "Patient.name[0].given[1]");
        assert_eq!(tree.location_of(&[4]), "Patient.birthDate");
    }

    #[test]
    fn test_cleared_nodes_are_pruned() {
        let mut tree = ElementNode::from_resource(&patient());
        tree.get_mut(&[4]).unwrap().clear();
        let resource = tree.to_resource().unwrap();
        assert!(resource.get("birthDate").is_none());
        assert_eq!(resource.get("active"), Some(&json!(true)));
    }

    #[test]
    fn test_emptied_array_is_dropped() {
        let mut tree = ElementNode::from_resource(&patient());
        tree.get_mut(&[2]).unwrap().clear();
        tree.get_mut(&[3]).unwrap().clear();
        let resource = tree.to_resource().unwrap();
        assert!(resource.get("name").is_none());
    }

    #[test]
    fn test_nested_resource_roots() {
        let bundle = Resource::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "a"}},
                {"resource": {"resourceType": "Observation", "id": "b"}}
            ]
        }))
        .unwrap();
        let tree = ElementNode::from_resource(&bundle);
        let roots = tree.resource_roots();
        assert_eq!(roots, vec![vec![], vec![1, 0], vec![2, 0]]);
        assert_eq!(tree.get(&[2, 0]).unwrap().resource_type(), Some("Observation"));
    }

    #[test]
    fn test_primitive_visitor_skips_resource_type() {
        let mut tree = ElementNode::from_resource(&patient());
        let mut seen = Vec::new();
        tree.try_for_each_primitive_mut(&mut |node| {
            seen.push(node.name().to_string());
            Ok(())
        })
        .unwrap();
        assert!(!seen.contains(&"resourceType".to_string()));
        assert_eq!(seen.iter().filter(|n| *n == "given").count(), 2);
    }

    #[test]
    fn test_emptied_root_is_not_a_resource() {
        let mut tree = ElementNode::from_resource(&patient());
        tree.clear();
        assert!(tree.to_resource().is_err());
    }
}
