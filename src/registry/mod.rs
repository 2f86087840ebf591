//! # Connection Registry & Quota Policy
//!
//! Tracks every live connection and decides which connections may exist and
//! be enabled at all, independent of per-tick behavior. The registry owns an
//! arena keyed by stable [`ConnectionId`]; origin and owner indexes are
//! auxiliary key maps into the arena, so a connection never references the
//! registry back.
//!
//! ## Admission Checks
//!
//! `register` (and `set_enabled(true)`, and `reopen`) enforce, in order:
//!
//! 1. Property validity (ranges, layout spacing, page-count clamp)
//! 2. One connection per origin position
//! 3. Claim permission for every position the layout occupies
//! 4. At most `max_enabled_connections` enabled connections per owner
//! 5. Per file, among one owner's *enabled* connections: at most one writer
//!    and at most one additional reader
//! 6. For write-mode connections targeting a file that does not exist yet:
//!    the sandbox file-count cap
//! 7. Sandbox confinement of the backing file name
//!
//! Every rejection is a typed [`Error`], never a bare boolean.
//!
//! ## Durability
//!
//! The registry mirrors each connection's metadata and properties into a
//! [`Catalog`], the consumed contract for the host's durable store. The
//! bundled [`MemoryCatalog`] backs tests and hosts that do not persist.

use std::path::PathBuf;

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::config::QuotaLimits;
use crate::connection::{ConnMode, ConnectionProperties, StorageConnection};
use crate::error::{Error, QuotaKind, Result};
use crate::geom::Position;
use crate::store::{PageFile, Sandbox};
use crate::types::{ConnectionId, OwnerId};
use crate::world::{ClaimCheck, Materials, Notify, SignalIo};

/// Registry-level record of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionMeta {
    pub id: ConnectionId,
    pub owner: OwnerId,
    pub enabled: bool,
}

/// Durable catalog of connections, implemented by the host. The registry
/// calls these on every mutation; lookups at startup are the host's concern.
pub trait Catalog {
    fn insert(&mut self, meta: &ConnectionMeta, props: &ConnectionProperties);
    fn remove(&mut self, id: ConnectionId);
    fn set_enabled(&mut self, id: ConnectionId, enabled: bool);
    fn set_file(&mut self, id: ConnectionId, file: &str);
}

/// In-memory [`Catalog`] for tests and non-persisting hosts.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    rows: HashMap<ConnectionId, (ConnectionMeta, ConnectionProperties)>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&(ConnectionMeta, ConnectionProperties)> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Catalog for MemoryCatalog {
    fn insert(&mut self, meta: &ConnectionMeta, props: &ConnectionProperties) {
        self.rows.insert(meta.id, (*meta, props.clone()));
    }

    fn remove(&mut self, id: ConnectionId) {
        self.rows.remove(&id);
    }

    fn set_enabled(&mut self, id: ConnectionId, enabled: bool) {
        if let Some((meta, _)) = self.rows.get_mut(&id) {
            meta.enabled = enabled;
        }
    }

    fn set_file(&mut self, id: ConnectionId, file: &str) {
        if let Some((_, props)) = self.rows.get_mut(&id) {
            props.file = file.to_string();
        }
    }
}

struct Entry {
    meta: ConnectionMeta,
    conn: StorageConnection,
}

/// Arena of live connections plus the quota/conflict policy gating them.
pub struct Registry<C: Catalog> {
    base_dir: PathBuf,
    limits: QuotaLimits,
    materials: Materials,
    catalog: C,
    next_id: u64,
    connections: HashMap<ConnectionId, Entry>,
    by_origin: HashMap<Position, ConnectionId>,
    by_owner: HashMap<OwnerId, Vec<ConnectionId>>,
}

impl<C: Catalog> Registry<C> {
    pub fn new<P: Into<PathBuf>>(base_dir: P, limits: QuotaLimits, catalog: C) -> Self {
        Self {
            base_dir: base_dir.into(),
            limits,
            materials: Materials::default(),
            catalog,
            next_id: 1,
            connections: HashMap::new(),
            by_origin: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }

    /// The sandbox directory backing `owner`'s files.
    pub fn owner_sandbox(&self, owner: OwnerId) -> Sandbox {
        Sandbox::new(self.base_dir.join(owner.to_string()))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn meta_at(&self, origin: Position) -> Option<ConnectionMeta> {
        let id = self.by_origin.get(&origin)?;
        Some(self.connections.get(id)?.meta)
    }

    pub fn meta(&self, id: ConnectionId) -> Option<ConnectionMeta> {
        Some(self.connections.get(&id)?.meta)
    }

    /// Ids of `owner`'s connections, in registration order.
    pub fn owner_connections(&self, owner: OwnerId) -> &[ConnectionId] {
        self.by_owner.get(&owner).map_or(&[], Vec::as_slice)
    }

    /// Admit a new connection. Runs every admission check, places the device
    /// into the world, and records it in the arena, indexes, and catalog.
    /// The connection starts enabled.
    pub fn register<H: SignalIo + ClaimCheck>(
        &mut self,
        owner: OwnerId,
        props: ConnectionProperties,
        host: &mut H,
    ) -> Result<ConnectionId> {
        let props = props.validated()?;

        if self.by_origin.contains_key(&props.origin) {
            return Err(Error::InvalidProperties {
                reason: format!("origin {} already has a connection", props.origin),
            });
        }

        let sandbox = self.owner_sandbox(owner);
        let conn = StorageConnection::new(
            props,
            owner,
            self.materials,
            self.limits,
            sandbox.clone(),
        )?;

        for position in conn.positions() {
            if !host.can_claim(owner, position) {
                return Err(Error::PermissionDenied { position });
            }
        }

        self.check_enabled_cap(owner, None)?;
        self.check_file_policy(owner, &conn.props().file, conn.props().mode, None)?;
        if conn.props().mode == ConnMode::Write {
            self.check_file_count(&sandbox, &conn.props().file)?;
        }

        conn.place(host);

        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        let meta = ConnectionMeta {
            id,
            owner,
            enabled: true,
        };
        info!(%id, %owner, origin = %conn.props().origin, mode = %conn.props().mode,
            file = %conn.props().file, "connection registered");

        self.by_origin.insert(conn.props().origin, id);
        self.by_owner.entry(owner).or_default().push(id);
        self.catalog.insert(&meta, conn.props());
        self.connections.insert(id, Entry { meta, conn });
        Ok(id)
    }

    /// Remove the connection at `origin`, discarding any in-flight
    /// transaction without committing. Returns whether anything existed.
    pub fn unregister(&mut self, origin: Position) -> bool {
        let Some(id) = self.by_origin.remove(&origin) else {
            return false;
        };
        let Some(mut entry) = self.connections.remove(&id) else {
            return false;
        };

        entry.conn.abort();
        if let Some(ids) = self.by_owner.get_mut(&entry.meta.owner) {
            ids.retain(|other| *other != id);
        }
        self.catalog.remove(id);
        info!(%id, %origin, "connection unregistered");
        true
    }

    /// Enable or disable a connection. Disabling force-finalizes any
    /// in-flight transaction (terminal-condition semantics) and always
    /// succeeds; enabling re-runs the enabled-count and file-conflict
    /// checks first.
    pub fn set_enabled<H: SignalIo + Notify>(
        &mut self,
        id: ConnectionId,
        enabled: bool,
        host: &mut H,
    ) -> Result<()> {
        let entry = self.connections.get(&id).ok_or(Error::NotFound {
            target: id.to_string(),
        })?;
        if entry.meta.enabled == enabled {
            return Ok(());
        }

        if enabled {
            let owner = entry.meta.owner;
            let file = entry.conn.props().file.clone();
            let mode = entry.conn.props().mode;
            self.check_enabled_cap(owner, Some(id))?;
            self.check_file_policy(owner, &file, mode, Some(id))?;
        }

        let entry = self
            .connections
            .get_mut(&id)
            .ok_or(Error::NotFound {
                target: id.to_string(),
            })?;
        if !enabled {
            entry.conn.finalize(host);
        }
        entry.meta.enabled = enabled;
        self.catalog.set_enabled(id, enabled);
        debug!(%id, enabled, "connection toggled");
        Ok(())
    }

    /// Atomically point the connection at `origin` at a new backing file.
    /// The replacement is validated and constructed first; only on success
    /// is the old backing torn down, so a failed reopen leaves the original
    /// connection fully functional.
    pub fn reopen<H: SignalIo + Notify>(
        &mut self,
        origin: Position,
        new_file: &str,
        host: &mut H,
    ) -> Result<()> {
        let id = *self.by_origin.get(&origin).ok_or(Error::NotFound {
            target: format!("at {origin}"),
        })?;

        let entry = self.connections.get(&id).ok_or(Error::NotFound {
            target: id.to_string(),
        })?;
        let owner = entry.meta.owner;
        let mode = entry.conn.props().mode;
        let enabled = entry.meta.enabled;
        let page_size_bytes = entry.conn.props().page_size_bytes();
        let page_count = entry.conn.props().page_count;

        if enabled {
            self.check_file_policy(owner, new_file, mode, Some(id))?;
        }
        let sandbox = self.owner_sandbox(owner);
        let path = sandbox.resolve(new_file)?;
        if mode == ConnMode::Write {
            self.check_file_count(&sandbox, new_file)?;
        }
        let replacement = PageFile::new(path, page_size_bytes, page_count);

        // Checks passed; commit whatever is in flight against the old file
        // before the swap.
        if let Some(entry) = self.connections.get_mut(&id) {
            entry.conn.finalize(host);
            entry.conn.set_backing(new_file.to_string(), replacement);
        }
        self.catalog.set_file(id, new_file);
        info!(%id, file = new_file, "connection reopened");
        Ok(())
    }

    /// Drive every enabled connection one step. A connection whose origin
    /// marker has gone stale unregisters itself; other connections are
    /// unaffected.
    pub fn step_all<H: SignalIo + Notify>(&mut self, host: &mut H) {
        let due: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, entry)| entry.meta.enabled)
            .map(|(id, _)| *id)
            .collect();

        for id in due {
            let Some(entry) = self.connections.get_mut(&id) else {
                continue;
            };
            let owner = entry.meta.owner;
            if let Err(err) = entry.conn.step(host) {
                let origin = entry.conn.props().origin;
                warn!(%id, %origin, error = %err, "connection stale, removing");
                self.unregister(origin);
                host.notify(owner, &format!("connection at {origin} removed: {err}"));
            }
        }
    }

    fn check_enabled_cap(&self, owner: OwnerId, exclude: Option<ConnectionId>) -> Result<()> {
        let enabled = self
            .owner_connections(owner)
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| self.connections.get(id))
            .filter(|entry| entry.meta.enabled)
            .count() as u32;
        if enabled >= self.limits.max_enabled_connections {
            return Err(Error::QuotaExceeded {
                kind: QuotaKind::EnabledConnections,
                limit: u64::from(self.limits.max_enabled_connections),
                required: u64::from(enabled) + 1,
            });
        }
        Ok(())
    }

    /// Per owner and file, among enabled connections: at most one writer,
    /// at most two participants total.
    fn check_file_policy(
        &self,
        owner: OwnerId,
        file: &str,
        mode: ConnMode,
        exclude: Option<ConnectionId>,
    ) -> Result<()> {
        let mut writers = 0u32;
        let mut participants = 0u32;
        for id in self.owner_connections(owner) {
            if Some(*id) == exclude {
                continue;
            }
            let Some(entry) = self.connections.get(id) else {
                continue;
            };
            if !entry.meta.enabled || entry.conn.props().file != file {
                continue;
            }
            participants += 1;
            if entry.conn.props().mode == ConnMode::Write {
                writers += 1;
            }
        }

        if participants >= 2 {
            return Err(Error::FileConflict {
                file: file.to_string(),
                reason: "file already has two enabled connections",
            });
        }
        if mode == ConnMode::Write && writers >= 1 {
            return Err(Error::FileConflict {
                file: file.to_string(),
                reason: "file already has an enabled writer",
            });
        }
        Ok(())
    }

    /// The file-count cap only applies when a write-mode connection would
    /// create a new file.
    fn check_file_count(&self, sandbox: &Sandbox, file: &str) -> Result<()> {
        let path = sandbox.resolve(file)?;
        if path.exists() {
            return Ok(());
        }
        let count = sandbox.file_count();
        if count >= self.limits.max_file_count {
            return Err(Error::QuotaExceeded {
                kind: QuotaKind::FileCount,
                limit: u64::from(self.limits.max_file_count),
                required: u64::from(count) + 1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Direction, Layouts};
    use crate::world::{ColorSchemes, SimWorld};
    use tempfile::{tempdir, TempDir};

    fn props(mode: ConnMode, origin: Position, file: &str) -> ConnectionProperties {
        let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
        ConnectionProperties {
            mode,
            origin,
            layout,
            scheme: ColorSchemes::new().default_scheme(),
            address_bits: 4,
            word_size: 8,
            page_size_words: 8,
            page_count: 16,
            latency: 1,
            data_rate: 1,
            file: file.to_string(),
        }
    }

    fn registry() -> (Registry<MemoryCatalog>, SimWorld, TempDir) {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path(), QuotaLimits::default(), MemoryCatalog::new());
        (registry, SimWorld::new(), dir)
    }

    /// Origins far enough apart that 4+8 bit east-facing lines never touch.
    fn origin(n: i32) -> Position {
        Position::new(0, 64, n * 4)
    }

    #[test]
    fn register_places_and_catalogs() {
        let (mut registry, mut world, _dir) = registry();
        let owner = OwnerId(1);

        let id = registry
            .register(owner, props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap();

        let meta = registry.meta_at(origin(0)).unwrap();
        assert_eq!(meta.id, id);
        assert_eq!(meta.owner, owner);
        assert!(meta.enabled);
        assert_eq!(registry.catalog().len(), 1);
        assert_eq!(
            world.visual(origin(0)),
            Some(Materials::default().origin)
        );
    }

    #[test]
    fn one_connection_per_origin() {
        let (mut registry, mut world, _dir) = registry();
        registry
            .register(OwnerId(1), props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap();
        let err = registry
            .register(OwnerId(2), props(ConnMode::Read, origin(0), "b.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProperties { .. }));
    }

    #[test]
    fn unclaimable_position_denies_registration() {
        let (mut registry, mut world, _dir) = registry();
        // Deny one data-bit position of the would-be layout.
        world.deny(Position::new(12, 64, 0));

        let err = registry
            .register(OwnerId(1), props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
        assert!(registry.is_empty());
        assert_eq!(world.visual(origin(0)), None, "nothing may be placed");
    }

    #[test]
    fn second_writer_on_same_file_conflicts() {
        let (mut registry, mut world, _dir) = registry();
        let owner = OwnerId(1);
        let first = registry
            .register(owner, props(ConnMode::Write, origin(0), "f.bin"), &mut world)
            .unwrap();

        let err = registry
            .register(owner, props(ConnMode::Write, origin(1), "f.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(err, Error::FileConflict { .. }));

        // Disabling the first writer clears the way.
        registry.set_enabled(first, false, &mut world).unwrap();
        registry
            .register(owner, props(ConnMode::Write, origin(1), "f.bin"), &mut world)
            .unwrap();
    }

    #[test]
    fn one_reader_may_join_a_writer_but_not_two() {
        let (mut registry, mut world, _dir) = registry();
        let owner = OwnerId(1);
        registry
            .register(owner, props(ConnMode::Write, origin(0), "f.bin"), &mut world)
            .unwrap();
        registry
            .register(owner, props(ConnMode::Read, origin(1), "f.bin"), &mut world)
            .unwrap();

        let err = registry
            .register(owner, props(ConnMode::Read, origin(2), "f.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(err, Error::FileConflict { .. }));
    }

    #[test]
    fn enabled_connection_cap_is_per_owner() {
        let (mut registry, mut world, _dir) = registry();
        let owner = OwnerId(1);
        for n in 0..3 {
            registry
                .register(
                    owner,
                    props(ConnMode::Read, origin(n), &format!("{n}.bin")),
                    &mut world,
                )
                .unwrap();
        }

        let err = registry
            .register(owner, props(ConnMode::Read, origin(3), "d.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                kind: QuotaKind::EnabledConnections,
                ..
            }
        ));

        // A different owner is unaffected.
        registry
            .register(OwnerId(2), props(ConnMode::Read, origin(3), "d.bin"), &mut world)
            .unwrap();
    }

    #[test]
    fn file_count_quota_blocks_new_write_files() {
        let dir = tempdir().unwrap();
        let limits = QuotaLimits {
            max_file_count: 1,
            ..QuotaLimits::default()
        };
        let mut registry = Registry::new(dir.path(), limits, MemoryCatalog::new());
        let mut world = SimWorld::new();
        let owner = OwnerId(1);

        let sandbox = registry.owner_sandbox(owner);
        std::fs::create_dir_all(sandbox.root()).unwrap();
        std::fs::write(sandbox.root().join("existing.bin"), b"x").unwrap();

        let err = registry
            .register(owner, props(ConnMode::Write, origin(0), "new.bin"), &mut world)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::QuotaExceeded {
                kind: QuotaKind::FileCount,
                ..
            }
        ));

        // Pointing at the existing file does not create anything new.
        registry
            .register(owner, props(ConnMode::Write, origin(0), "existing.bin"), &mut world)
            .unwrap();
    }

    #[test]
    fn escaping_file_name_is_rejected() {
        let (mut registry, mut world, _dir) = registry();
        let err = registry
            .register(
                OwnerId(1),
                props(ConnMode::Write, origin(0), "../outside.bin"),
                &mut world,
            )
            .unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_returns_whether_anything_existed() {
        let (mut registry, mut world, _dir) = registry();
        registry
            .register(OwnerId(1), props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap();

        assert!(registry.unregister(origin(0)));
        assert!(!registry.unregister(origin(0)));
        assert!(registry.is_empty());
        assert!(registry.catalog().is_empty());
    }

    #[test]
    fn disabled_connections_are_not_stepped() {
        let (mut registry, mut world, _dir) = registry();
        let id = registry
            .register(OwnerId(1), props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap();
        registry.set_enabled(id, false, &mut world).unwrap();

        // Strobe high would open a transaction if the connection ran.
        world.set_signal(origin(0).offset(crate::geom::STROBE_OFFSET), true);
        registry.step_all(&mut world);
        assert!(!registry.connections[&id].conn.is_active());

        registry.set_enabled(id, true, &mut world).unwrap();
        registry.step_all(&mut world);
        assert!(registry.connections[&id].conn.is_active());
    }

    #[test]
    fn stale_origin_self_unregisters() {
        let (mut registry, mut world, _dir) = registry();
        let owner = OwnerId(1);
        registry
            .register(owner, props(ConnMode::Read, origin(0), "a.bin"), &mut world)
            .unwrap();
        registry
            .register(owner, props(ConnMode::Read, origin(1), "b.bin"), &mut world)
            .unwrap();

        world.break_visual(origin(0));
        registry.step_all(&mut world);

        assert_eq!(registry.len(), 1);
        assert!(registry.meta_at(origin(0)).is_none());
        assert!(registry.meta_at(origin(1)).is_some());
        let notes = world.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, owner);
    }

    #[test]
    fn reopen_failure_leaves_connection_intact() {
        let (mut registry, mut world, _dir) = registry();
        let id = registry
            .register(OwnerId(1), props(ConnMode::Write, origin(0), "a.bin"), &mut world)
            .unwrap();

        let err = registry
            .reopen(origin(0), "../evil.bin", &mut world)
            .unwrap_err();
        assert!(matches!(err, Error::PathEscape { .. }));

        let (_, catalog_props) = registry.catalog().get(id).unwrap();
        assert_eq!(catalog_props.file, "a.bin");
        assert_eq!(registry.connections[&id].conn.props().file, "a.bin");

        registry.reopen(origin(0), "b.bin", &mut world).unwrap();
        let (_, catalog_props) = registry.catalog().get(id).unwrap();
        assert_eq!(catalog_props.file, "b.bin");
    }
}
