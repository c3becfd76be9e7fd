use std::any::TypeId;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};

use super::entity::Entity;
use super::model::EntityType;

type Slot = Arc<OnceCell<Arc<EntityType>>>;

static ENTITY_TYPES: Lazy<DashMap<TypeId, Slot>> = Lazy::new(DashMap::new);

/// Cached metadata for `E`.
///
/// The first call builds the [`EntityType`]; concurrent first callers block on
/// the same slot so the type is built at most once. The map shard lock is
/// released before building, which lets a descriptor resolve its `target`
/// entity recursively.
///
/// # Panics
///
/// Panics when the descriptor is inconsistent (a key holding properties of
/// another type), which can only come from a hand-written `Entity` impl.
pub fn get_entity_type<E: Entity>() -> Arc<EntityType> {
	let type_id = TypeId::of::<E>();
	let slot = ENTITY_TYPES
		.entry(type_id)
		.or_insert_with(|| Arc::new(OnceCell::new()))
		.clone();
	slot.get_or_init(|| {
		let descriptor = E::descriptor();
		tracing::debug!(entity = descriptor.type_name, "building entity metadata");
		match EntityType::build(type_id, descriptor) {
			Ok(entity) => Arc::new(entity),
			Err(e) => panic!("invalid entity descriptor: {}", e),
		}
	})
	.clone()
}
