// ---------------------------------------------------------------------------
// Persistence of level-control resources inside the host's save
// ---------------------------------------------------------------------------
//
// The host owns the save file. It hands this crate an extension map of
// key -> bytes on load and asks for one on save. Each persisted resource
// implements `Saveable` and is registered once with `register_saveable`.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use bevy::prelude::*;

/// A resource that travels with the save under a stable key.
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Key in the host's extension map. Never change it once shipped.
    const SAVE_KEY: &'static str;

    /// `None` leaves the key out of the save.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Must not fail: damaged bytes decode to a usable value.
    fn load_from_bytes(bytes: &[u8]) -> Self;

    /// Value installed when a loaded save carries no entry for this key.
    fn load_missing() -> Self {
        Self::default()
    }
}

/// `bitcode::decode`, falling back to `T::default()` with a warning.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    bitcode::decode(bytes).unwrap_or_else(|e| {
        warn!(
            "Saveable {}: {} bytes did not decode ({}), using defaults",
            key,
            bytes.len(),
            e
        );
        T::default()
    })
}

/// Type-erased handle on one registered `Saveable` type.
trait PersistedResource: Send + Sync {
    fn key(&self) -> &'static str;
    fn save(&self, world: &World) -> Option<Vec<u8>>;
    fn load(&self, world: &mut World, bytes: &[u8]);
    fn load_missing(&self, world: &mut World);
    fn reset(&self, world: &mut World);
}

struct Persisted<T>(PhantomData<fn() -> T>);

impl<T: Saveable> PersistedResource for Persisted<T> {
    fn key(&self) -> &'static str {
        T::SAVE_KEY
    }

    fn save(&self, world: &World) -> Option<Vec<u8>> {
        world.get_resource::<T>()?.save_to_bytes()
    }

    fn load(&self, world: &mut World, bytes: &[u8]) {
        world.insert_resource(T::load_from_bytes(bytes));
    }

    fn load_missing(&self, world: &mut World) {
        world.insert_resource(T::load_missing());
    }

    fn reset(&self, world: &mut World) {
        world.insert_resource(T::default());
    }
}

/// Every level-control resource that is written to and read from the save.
///
/// The host's save pipeline calls [`save_all`](Self::save_all) when writing
/// and [`load_all`](Self::load_all) when reading; [`reset_all`](Self::reset_all)
/// gives a new game a fresh policy context.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    entries: Vec<Box<dyn PersistedResource>>,
}

impl SaveableRegistry {
    /// Panics in debug builds on a duplicate `SAVE_KEY`.
    pub fn register<T: Saveable>(&mut self) {
        if self.entries.iter().any(|e| e.key() == T::SAVE_KEY) {
            warn!("SaveableRegistry: '{}' registered twice", T::SAVE_KEY);
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", T::SAVE_KEY);
            return;
        }
        self.entries.push(Box::new(Persisted::<T>(PhantomData)));
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.key())
    }

    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        self.entries
            .iter()
            .filter_map(|e| e.save(world).map(|bytes| (e.key().to_string(), bytes)))
            .collect()
    }

    /// Resources whose key is absent take [`Saveable::load_missing`], so a
    /// save written before the mod was enabled loads into a fresh context.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            match extensions.get(entry.key()) {
                Some(bytes) => entry.load(world, bytes),
                None => entry.load_missing(world),
            }
        }
        info!("Level control state loaded ({} keys present)", extensions.len());
    }

    pub fn reset_all(&self, world: &mut World) {
        for entry in &self.entries {
            entry.reset(world);
        }
    }
}

pub trait SaveableAppExt {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self;
}

impl SaveableAppExt for App {
    fn register_saveable<T: Saveable>(&mut self) -> &mut Self {
        self.init_resource::<SaveableRegistry>();
        self.world_mut()
            .resource_mut::<SaveableRegistry>()
            .register::<T>();
        self
    }
}
