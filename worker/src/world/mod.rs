pub mod component_registry;
pub mod entity_view;
pub mod listeners;
pub mod object_graph;
