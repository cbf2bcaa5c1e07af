use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::MeshDevice;
use crate::geometry::{GeometryBuffer, GeometryError};
use crate::mesh::MeshKey;

/// Compiled texture coordinates for one lattice size.
#[derive(Debug)]
pub struct SharedCoordinates<B> {
    key: MeshKey,
    geometry: GeometryBuffer<B>,
}

impl<B> SharedCoordinates<B> {
    #[inline]
    pub fn key(&self) -> MeshKey {
        self.key
    }

    /// Device buffer holding one `[u, v]` pair per lattice strip point.
    pub fn buffer(&self) -> Option<&B> {
        self.geometry.device_buffer()
    }

    pub fn point_count(&self) -> usize {
        self.geometry.point_count()
    }
}

#[derive(Debug)]
struct Entry<B> {
    ref_count: usize,
    coords: Arc<SharedCoordinates<B>>,
}

/// Keyed, reference-counted texture-coordinate buffers.
///
/// Build one per device and hand it to every mesh; all methods take a single
/// map-level lock, so at most one buffer exists per key.
#[derive(Debug)]
pub struct SharedCoordinateCache<B> {
    entries: Mutex<HashMap<MeshKey, Entry<B>>>,
}

impl<B> Default for SharedCoordinateCache<B> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<B> SharedCoordinateCache<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key`, compiling it on first use.
    ///
    /// Every successful call must be balanced by one [`remove`](Self::remove).
    pub fn get<D>(
        &self,
        key: MeshKey,
        device: &D,
    ) -> Result<Arc<SharedCoordinates<B>>, GeometryError>
    where
        D: MeshDevice<Buffer = B>,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&key) {
            entry.ref_count += 1;
            return Ok(Arc::clone(&entry.coords));
        }

        let mut geometry = texture_coordinates(key)?;
        geometry.compile(device)?;
        let coords = Arc::new(SharedCoordinates { key, geometry });
        entries.insert(
            key,
            Entry {
                ref_count: 1,
                coords: Arc::clone(&coords),
            },
        );
        log::debug!("shared texture coordinates created for {key}");
        Ok(coords)
    }

    /// Drops one reference; the entry is evicted at zero.
    pub fn remove(&self, key: MeshKey) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&key) else {
            log::warn!("release of unknown shared texture coordinates {key}");
            return;
        };
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            entries.remove(&key);
            log::debug!("shared texture coordinates evicted for {key}");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, key: MeshKey) -> bool {
        self.entries.lock().contains_key(&key)
    }

    /// Current reference count for `key` (0 when absent).
    pub fn ref_count(&self, key: MeshKey) -> usize {
        self.entries.lock().get(&key).map_or(0, |e| e.ref_count)
    }
}

/// Canonical texture coordinates for a lattice of `key`'s dimensions.
///
/// Strip `r` interleaves lattice rows `r` and `r + 1`; point `j` of a strip
/// sits at column `j / 2`, row `r + j % 2`. All strips are concatenated, so
/// coordinate `k` pairs with vertex `k` of every mesh built on the lattice.
pub fn texture_coordinates<B>(key: MeshKey) -> Result<GeometryBuffer<B>, GeometryError> {
    const LABEL: &str = "shared texture coordinates";
    let per_strip = key.strip_len();

    let total = u64::from(per_strip) * u64::from(key.vertical_divisions());
    if total > u64::from(u32::MAX) {
        return Err(GeometryError::TooManyPoints { label: LABEL });
    }

    let mut geometry = GeometryBuffer::tex_coords(LABEL);
    geometry.allocate(total as usize);

    let mut strip = Vec::with_capacity(per_strip as usize);
    for r in 0..key.vertical_divisions() {
        strip.clear();
        strip.extend((0..per_strip).map(|j| key.tex_coord(r, j)));
        geometry.add_segment(&strip)?;
    }
    Ok(geometry)
}
