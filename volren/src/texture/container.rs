use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use log::{debug, trace};
use parking_lot::{
    ArcRwLockReadGuard, ArcRwLockWriteGuard, Mutex, RawRwLock, RwLock,
};
use serde::{Deserialize, Serialize};

use crate::{error::TextureError, render::ViewId};

use super::{Access, TextureData, TextureSpec};

type Result<T> = std::result::Result<T, TextureError>;

/// Index of a lease. Stale once the lease is released or evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvictionPolicy {
    /// Evict the least recently used lease nobody borrows
    Lru,
    /// Report exhaustion
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Maximum number of live leases
    pub capacity: usize,
    /// Maximum bytes of all live leases
    pub byte_budget: Option<usize>,
    pub policy: EvictionPolicy,
    /// Largest allowed width or height
    pub max_texture_size: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            capacity: 32,
            byte_budget: None,
            policy: EvictionPolicy::Lru,
            max_texture_size: 8192,
        }
    }
}

struct Lease {
    owner: ViewId,
    spec: TextureSpec,
    access: Access,
    last_used: u64,
    readers: usize,
    writer: bool,
    data: Arc<RwLock<TextureData>>,
}

impl Lease {
    fn borrowed(&self) -> bool {
        self.writer || self.readers > 0
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    lease: Option<Lease>,
}

#[derive(Default)]
struct Inner {
    slots: Vec<Slot>,
    free: Vec<usize>,
    clock: u64,
    in_use: usize,
    bytes_in_use: usize,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn lease_mut(&mut self, handle: TextureHandle) -> Result<&mut Lease> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.lease.as_mut())
            .ok_or(TextureError::StaleHandle(handle))
    }

    /// Drop a lease, its handle becomes stale
    fn vacate(&mut self, index: usize) -> Option<Lease> {
        let slot = &mut self.slots[index];
        let lease = slot.lease.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.in_use -= 1;
        self.bytes_in_use -= lease.spec.bytes();
        Some(lease)
    }

    fn lru_victim(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.lease.as_ref().map(|l| (i, l)))
            .filter(|(_, lease)| !lease.borrowed())
            .min_by_key(|(_, lease)| lease.last_used)
            .map(|(i, _)| i)
    }
}

/// Arena of render targets shared by all views of a pipeline.
///
/// Every operation takes the single internal lock, so leases are never
/// handed out twice. Texel data lives outside the lock, borrowed through
/// [`TextureReadGuard`] and [`TextureWriteGuard`].
pub struct TextureContainer {
    config: ContainerConfig,
    inner: Mutex<Inner>,
}

impl TextureContainer {
    pub fn new(config: ContainerConfig) -> TextureContainer {
        TextureContainer {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Change the largest allowed width or height.
    /// Leases above the new limit are released, returns how many.
    pub fn set_max_texture_size(&mut self, max_texture_size: usize) -> usize {
        self.config.max_texture_size = max_texture_size;
        let inner = self.inner.get_mut();
        let oversized: Vec<usize> = inner
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.lease.as_ref().map(|l| (i, l.spec)))
            .filter(|(_, spec)| spec.width > max_texture_size || spec.height > max_texture_size)
            .map(|(i, _)| i)
            .collect();
        for &index in &oversized {
            inner.vacate(index);
        }
        debug!(
            "Texture size limit {max_texture_size}, released {} textures",
            oversized.len()
        );
        oversized.len()
    }

    fn over_budget(&self, inner: &Inner, bytes: usize) -> bool {
        inner.in_use >= self.config.capacity
            || self
                .config
                .byte_budget
                .map_or(false, |budget| inner.bytes_in_use + bytes > budget)
    }

    pub fn lease(&self, owner: ViewId, spec: TextureSpec, access: Access) -> Result<TextureHandle> {
        let limit = self.config.max_texture_size;
        let too_large = spec.width == 0
            || spec.height == 0
            || spec.width > limit
            || spec.height > limit
            || self.config.byte_budget.map_or(false, |b| spec.bytes() > b);
        if too_large {
            return Err(TextureError::TooLarge {
                width: spec.width,
                height: spec.height,
                limit,
            });
        }

        let mut inner = self.inner.lock();
        while self.over_budget(&inner, spec.bytes()) {
            let victim = match self.config.policy {
                EvictionPolicy::Lru => inner.lru_victim(),
                EvictionPolicy::Fail => None,
            };
            match victim {
                Some(index) => {
                    if let Some(lease) = inner.vacate(index) {
                        debug!("Evicted texture {index} of view {:?}", lease.owner);
                    }
                }
                None => {
                    return Err(TextureError::Exhausted {
                        in_use: inner.in_use,
                        capacity: self.config.capacity,
                    })
                }
            }
        }

        let last_used = inner.tick();
        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                inner.slots.push(Slot::default());
                inner.slots.len() - 1
            }
        };
        inner.in_use += 1;
        inner.bytes_in_use += spec.bytes();

        let slot = &mut inner.slots[index];
        slot.lease = Some(Lease {
            owner,
            spec,
            access,
            last_used,
            readers: 0,
            writer: false,
            data: Arc::new(RwLock::new(TextureData::new(&spec))),
        });
        let handle = TextureHandle {
            index: index as u32,
            generation: slot.generation,
        };
        trace!("Leased {handle:?} {spec:?} to view {owner:?}");
        Ok(handle)
    }

    /// Give a lease back. A borrowed lease can not be released.
    pub fn release(&self, handle: TextureHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.lease_mut(handle)?.borrowed() {
            return Err(TextureError::Busy(handle));
        }
        inner.vacate(handle.index as usize);
        trace!("Released {handle:?}");
        Ok(())
    }

    /// Replace a lease by a new one of a different spec.
    /// The old handle becomes stale.
    pub fn resize(&self, handle: TextureHandle, spec: TextureSpec) -> Result<TextureHandle> {
        let (owner, access) = {
            let mut inner = self.inner.lock();
            let lease = inner.lease_mut(handle)?;
            (lease.owner, lease.access)
        };
        self.release(handle)?;
        self.lease(owner, spec, access)
    }

    /// Release every lease of a view, borrowed ones included.
    /// Returns the number of released leases.
    pub fn release_owner(&self, owner: ViewId) -> usize {
        let mut inner = self.inner.lock();
        let indices: Vec<usize> = inner
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.lease.as_ref().map_or(false, |l| l.owner == owner))
            .map(|(i, _)| i)
            .collect();
        for &index in &indices {
            inner.vacate(index);
        }
        if !indices.is_empty() {
            debug!("Released {} textures of view {owner:?}", indices.len());
        }
        indices.len()
    }

    pub fn is_valid(&self, handle: TextureHandle) -> bool {
        self.inner.lock().lease_mut(handle).is_ok()
    }

    pub fn spec(&self, handle: TextureHandle) -> Result<TextureSpec> {
        Ok(self.inner.lock().lease_mut(handle)?.spec)
    }

    pub fn owner(&self, handle: TextureHandle) -> Result<ViewId> {
        Ok(self.inner.lock().lease_mut(handle)?.owner)
    }

    /// Mark as recently used
    pub fn touch(&self, handle: TextureHandle) -> Result<()> {
        let mut inner = self.inner.lock();
        let now = inner.tick();
        inner.lease_mut(handle)?.last_used = now;
        Ok(())
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use
    }

    pub fn bytes_in_use(&self) -> usize {
        self.inner.lock().bytes_in_use
    }

    pub fn leases_of(&self, owner: ViewId) -> usize {
        self.inner
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.lease.as_ref().map_or(false, |l| l.owner == owner))
            .count()
    }

    pub fn write(&self, handle: TextureHandle) -> Result<TextureWriteGuard<'_>> {
        let data = {
            let mut inner = self.inner.lock();
            let now = inner.tick();
            let lease = inner.lease_mut(handle)?;
            if lease.borrowed() {
                return Err(TextureError::Busy(handle));
            }
            lease.writer = true;
            lease.last_used = now;
            lease.data.clone()
        };
        Ok(TextureWriteGuard {
            container: self,
            handle,
            data: data.write_arc(),
        })
    }

    pub fn read(&self, handle: TextureHandle) -> Result<TextureReadGuard<'_>> {
        let data = {
            let mut inner = self.inner.lock();
            let now = inner.tick();
            let lease = inner.lease_mut(handle)?;
            let shared_ok = lease.access == Access::Shared || lease.readers == 0;
            if lease.writer || !shared_ok {
                return Err(TextureError::Busy(handle));
            }
            lease.readers += 1;
            lease.last_used = now;
            lease.data.clone()
        };
        Ok(TextureReadGuard {
            container: self,
            handle,
            data: data.read_arc(),
        })
    }

    fn end_write(&self, handle: TextureHandle) {
        // lease may be gone after release_owner
        if let Ok(lease) = self.inner.lock().lease_mut(handle) {
            lease.writer = false;
        }
    }

    fn end_read(&self, handle: TextureHandle) {
        if let Ok(lease) = self.inner.lock().lease_mut(handle) {
            lease.readers = lease.readers.saturating_sub(1);
        }
    }
}

impl std::fmt::Debug for TextureContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TextureContainer")
            .field("config", &self.config)
            .field("in_use", &inner.in_use)
            .field("bytes_in_use", &inner.bytes_in_use)
            .finish()
    }
}

impl std::fmt::Debug for TextureWriteGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureWriteGuard").field(&self.handle).finish()
    }
}

pub struct TextureWriteGuard<'a> {
    container: &'a TextureContainer,
    handle: TextureHandle,
    data: ArcRwLockWriteGuard<RawRwLock, TextureData>,
}

impl TextureWriteGuard<'_> {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Deref for TextureWriteGuard<'_> {
    type Target = TextureData;

    fn deref(&self) -> &TextureData {
        &self.data
    }
}

impl DerefMut for TextureWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut TextureData {
        &mut self.data
    }
}

impl Drop for TextureWriteGuard<'_> {
    fn drop(&mut self) {
        self.container.end_write(self.handle);
    }
}

impl std::fmt::Debug for TextureReadGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureReadGuard").field(&self.handle).finish()
    }
}

pub struct TextureReadGuard<'a> {
    container: &'a TextureContainer,
    handle: TextureHandle,
    data: ArcRwLockReadGuard<RawRwLock, TextureData>,
}

impl TextureReadGuard<'_> {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Deref for TextureReadGuard<'_> {
    type Target = TextureData;

    fn deref(&self) -> &TextureData {
        &self.data
    }
}

impl Drop for TextureReadGuard<'_> {
    fn drop(&mut self) {
        self.container.end_read(self.handle);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::texture::{AuxiliaryKind, TextureFormat};

    const VIEW: ViewId = ViewId(1);

    fn container(capacity: usize, policy: EvictionPolicy) -> TextureContainer {
        TextureContainer::new(ContainerConfig {
            capacity,
            policy,
            ..Default::default()
        })
    }

    #[test]
    fn fail_policy_reports_exhaustion() {
        let c = container(2, EvictionPolicy::Fail);
        let a = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        let b = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        let err = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap_err();
        assert_eq!(err, TextureError::Exhausted { in_use: 2, capacity: 2 });
        assert!(err.is_exhausted());
        assert!(c.is_valid(a) && c.is_valid(b));
    }

    #[test]
    fn lru_evicts_oldest_unborrowed() {
        let c = container(2, EvictionPolicy::Lru);
        let a = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        let b = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        c.touch(a).unwrap();
        let d = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        assert!(c.is_valid(a));
        assert!(!c.is_valid(b));
        assert!(c.is_valid(d));
        assert_eq!(c.write(b).unwrap_err(), TextureError::StaleHandle(b));
        assert_ne!(b, d);
    }

    #[test]
    fn borrowed_leases_are_never_evicted() {
        let c = container(2, EvictionPolicy::Lru);
        let a = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        let b = c.lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive).unwrap();
        let mut wa = c.write(a).unwrap();
        let _wb = c.write(b).unwrap();
        wa.set_texel(0, 0, &[1.0, 0.0, 0.0, 1.0]);
        assert!(c
            .lease(VIEW, TextureSpec::color(4, 4), Access::Exclusive)
            .unwrap_err()
            .is_exhausted());
        assert_eq!(wa.texel(0, 0), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn exclusive_borrowing() {
        let c = container(4, EvictionPolicy::Fail);
        let a = c.lease(VIEW, TextureSpec::color(2, 2), Access::Exclusive).unwrap();
        {
            let _w = c.write(a).unwrap();
            assert_eq!(c.write(a).unwrap_err(), TextureError::Busy(a));
            assert_eq!(c.read(a).unwrap_err(), TextureError::Busy(a));
            assert_eq!(c.release(a).unwrap_err(), TextureError::Busy(a));
        }
        let _r = c.read(a).unwrap();
        assert_eq!(c.read(a).unwrap_err(), TextureError::Busy(a));
    }

    #[test]
    fn shared_readers() {
        let c = container(4, EvictionPolicy::Fail);
        let spec = TextureSpec::auxiliary(AuxiliaryKind::FirstHitPosition, 2, 2);
        let a = c.lease(VIEW, spec, Access::Shared).unwrap();
        {
            let mut w = c.write(a).unwrap();
            w.set_texel(1, 1, &[0.5; 4]);
        }
        let r1 = c.read(a).unwrap();
        let r2 = c.read(a).unwrap();
        assert_eq!(r1.texel(1, 1), r2.texel(1, 1));
        assert_eq!(c.write(a).unwrap_err(), TextureError::Busy(a));
        drop((r1, r2));
        assert!(c.write(a).is_ok());
    }

    #[test]
    fn resize_gives_new_handle() {
        let c = container(4, EvictionPolicy::Fail);
        let a = c.lease(VIEW, TextureSpec::color(2, 2), Access::Exclusive).unwrap();
        let b = c.resize(a, TextureSpec::color(8, 8)).unwrap();
        assert!(!c.is_valid(a));
        assert_eq!(c.spec(b).unwrap().width, 8);
        assert_eq!(c.read(b).unwrap().width(), 8);
        assert_eq!(c.in_use(), 1);
    }

    #[test]
    fn view_teardown_releases_everything() {
        let c = container(8, EvictionPolicy::Fail);
        let other = ViewId(2);
        let a = c.lease(VIEW, TextureSpec::color(2, 2), Access::Exclusive).unwrap();
        let _ = c.lease(VIEW, TextureSpec::depth(2, 2), Access::Exclusive).unwrap();
        let kept = c.lease(other, TextureSpec::color(2, 2), Access::Exclusive).unwrap();
        let guard = c.write(a).unwrap();
        assert_eq!(c.release_owner(VIEW), 2);
        drop(guard);
        assert_eq!(c.leases_of(VIEW), 0);
        assert_eq!(c.in_use(), 1);
        assert!(c.is_valid(kept));
    }

    #[test]
    fn byte_budget() {
        let c = TextureContainer::new(ContainerConfig {
            capacity: 16,
            byte_budget: Some(1024),
            policy: EvictionPolicy::Fail,
            ..Default::default()
        });
        let spec = TextureSpec::color(8, 8).with_format(TextureFormat::Rgba16F);
        assert_eq!(spec.bytes(), 512);
        c.lease(VIEW, spec, Access::Exclusive).unwrap();
        c.lease(VIEW, spec, Access::Exclusive).unwrap();
        assert!(c.lease(VIEW, spec, Access::Exclusive).unwrap_err().is_exhausted());
        assert!(matches!(
            c.lease(VIEW, TextureSpec::color(64, 64), Access::Exclusive),
            Err(TextureError::TooLarge { .. })
        ));
        assert_eq!(c.bytes_in_use(), 1024);
    }

    #[test]
    fn lowering_size_limit_drops_large_leases() {
        let mut c = container(8, EvictionPolicy::Fail);
        let small = c.lease(VIEW, TextureSpec::color(16, 16), Access::Exclusive).unwrap();
        let large = c.lease(VIEW, TextureSpec::color(64, 16), Access::Exclusive).unwrap();
        assert_eq!(c.set_max_texture_size(32), 1);
        assert!(c.is_valid(small));
        assert!(!c.is_valid(large));
        assert_eq!(c.config().max_texture_size, 32);
        assert!(matches!(
            c.lease(VIEW, TextureSpec::color(64, 16), Access::Exclusive),
            Err(TextureError::TooLarge { limit: 32, .. })
        ));
        assert!(c.lease(VIEW, TextureSpec::color(32, 32), Access::Exclusive).is_ok());
    }

    #[test]
    fn concurrent_leases_are_distinct() {
        let c = container(64, EvictionPolicy::Fail);
        let handles = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4)
                .map(|v| {
                    let c = &c;
                    s.spawn(move || {
                        (0..16)
                            .map(|_| c.lease(ViewId(v), TextureSpec::color(2, 2), Access::Exclusive).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect::<Vec<_>>()
        });
        let unique: std::collections::HashSet<_> = handles.iter().collect();
        assert_eq!(unique.len(), 64);
        assert_eq!(c.in_use(), 64);
    }
}
