//! Entities, the identity map and reference resolution.

mod class;
#[allow(clippy::module_inception)]
mod entity;
mod id;
mod identity_map;
mod lifecycle;
mod model;
mod resolver;

pub use class::{EntityClass, EntityQuery};
pub use entity::Entity;
pub use id::EntityId;
pub use identity_map::IdentityMap;
pub use model::{Model, ModelQuery};
