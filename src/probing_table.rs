use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::iter::FusedIterator;

use log::debug;
use log::trace;
use log::warn;

use crate::config::TableConfig;
use crate::error::ConfigError;
use crate::error::TableError;
use crate::key::normalize_key;

/// The state of a single position in the backing sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot {
    /// Never written since the last rebuild. Ends every probe walk.
    #[default]
    Empty,
    /// Held an entry that was deleted. Probe walks continue past it, and an
    /// insert may reuse it.
    Tombstone,
    /// Holds a live entry under its normalized key.
    Occupied {
        /// The normalized key.
        key: String,
        /// The stored value.
        value: String,
    },
}

impl Slot {
    /// Returns `true` for [`Slot::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// Returns `true` for [`Slot::Tombstone`].
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone)
    }

    /// Returns `true` for [`Slot::Occupied`].
    pub fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }

    /// The key and value of an occupied slot.
    pub fn entry(&self) -> Option<(&str, &str)> {
        match self {
            Slot::Occupied { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Empty => f.write_str("[Empty]"),
            Slot::Tombstone => f.write_str("[Deleted]"),
            Slot::Occupied { key, value } => write!(f, "{key} : {value}"),
        }
    }
}

/// Outcome of a successful [`ProbingTable::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The key was new and now occupies a slot.
    Inserted,
    /// The key was already present. The stored value was left untouched.
    Duplicate,
}

impl Insertion {
    /// Whether the call completed. Duplicates count as completed calls, the
    /// table simply keeps the value it already had.
    pub fn succeeded(self) -> bool {
        true
    }

    /// Returns `true` if a new entry was written.
    pub fn inserted(self) -> bool {
        self == Insertion::Inserted
    }

    /// Returns `true` if the key was already present.
    pub fn is_duplicate(self) -> bool {
        self == Insertion::Duplicate
    }
}

/// Quadratic probe sequence over a table of `capacity` slots.
///
/// Attempt `p` visits `(home + p * p) % capacity`, starting at `p = 0`.
/// Since `(p + capacity)^2` and `p^2` are congruent modulo `capacity`, the
/// first `capacity` attempts reach every slot the sequence can ever reach,
/// so the sequence stops there.
///
/// For composite capacities the sequence does not reach every slot. Callers
/// handle an exhausted walk explicitly instead of switching policies.
#[derive(Debug, Clone)]
struct ProbeSeq {
    home: usize,
    offset: usize,
    attempt: usize,
    capacity: usize,
}

impl ProbeSeq {
    #[inline]
    fn new(hash: u64, capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            home: (hash % capacity as u64) as usize,
            offset: 0,
            attempt: 0,
            capacity,
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.attempt == self.capacity {
            return None;
        }

        let index = (self.home + self.offset) % self.capacity;
        // (p + 1)^2 = p^2 + 2p + 1
        self.offset = (self.offset + 2 * self.attempt + 1) % self.capacity;
        self.attempt += 1;
        Some(index)
    }
}

/// Where an insert probe walk ended.
enum InsertProbe {
    /// An occupied slot already holds the key.
    Found(usize),
    /// The first reusable slot on the walk.
    Vacant(usize),
    /// The walk reached every slot it can and found neither.
    Exhausted,
}

/// Walks the probe sequence for `key`. Tombstones are skipped, an empty slot
/// ends the walk.
fn find_index(slots: &[Slot], hash: u64, key: &str) -> Option<usize> {
    for index in ProbeSeq::new(hash, slots.len()) {
        match &slots[index] {
            Slot::Empty => return None,
            Slot::Tombstone => continue,
            Slot::Occupied { key: stored, .. } if stored == key => return Some(index),
            Slot::Occupied { .. } => {}
        }
    }

    None
}

/// Like [`find_index`], but also remembers the first tombstone so a new key
/// lands as early in its sequence as possible. The walk must still run to
/// an empty slot, since the key may sit past the tombstone.
fn find_insert_index(slots: &[Slot], hash: u64, key: &str) -> InsertProbe {
    let mut first_tombstone = None;
    for index in ProbeSeq::new(hash, slots.len()) {
        match &slots[index] {
            Slot::Empty => return InsertProbe::Vacant(first_tombstone.unwrap_or(index)),
            Slot::Tombstone => {
                first_tombstone.get_or_insert(index);
            }
            Slot::Occupied { key: stored, .. } if stored == key => {
                return InsertProbe::Found(index);
            }
            Slot::Occupied { .. } => {}
        }
    }

    first_tombstone.map_or(InsertProbe::Exhausted, InsertProbe::Vacant)
}

/// A string-keyed hash table using open addressing with quadratic probing.
///
/// Keys are normalized with [`normalize_key`] before they are hashed,
/// compared, or stored, so lookups ignore case and surrounding whitespace.
/// Deleted entries leave a [`Slot::Tombstone`] behind so that probe walks
/// for other keys still reach them. Tombstones are dropped when the table
/// grows.
///
/// Before an insert that would push `len / capacity` above the configured
/// maximum load factor, the table doubles its capacity and rehashes every
/// live entry.
///
/// ## Example
///
/// ```rust
/// # use quad_probe::Insertion;
/// # use quad_probe::ProbingTable;
/// #
/// let mut table = ProbingTable::new();
///
/// assert_eq!(table.insert("Pikachu", "electric")?, Insertion::Inserted);
/// assert_eq!(table.insert(" pikachu ", "mouse")?, Insertion::Duplicate);
/// assert_eq!(table.lookup("PIKACHU"), Some("electric"));
///
/// assert!(table.delete("pikachu"));
/// assert_eq!(table.lookup("pikachu"), None);
/// # Ok::<(), quad_probe::TableError>(())
/// ```
#[derive(Clone)]
pub struct ProbingTable<S> {
    slots: Vec<Slot>,
    live: usize,
    tombstones: usize,
    resizes: usize,
    max_load_factor: f64,
    hash_builder: S,
}

impl<S> Debug for ProbingTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbingTable")
            .field(
                "slots",
                &self
                    .slots
                    .iter()
                    .map(|slot| match slot {
                        Slot::Empty => ".",
                        Slot::Tombstone => "x",
                        Slot::Occupied { key, .. } => key.as_str(),
                    })
                    .collect::<Vec<_>>(),
            )
            .field("live", &self.live)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.slots.len())
            .field("max_load_factor", &self.max_load_factor)
            .finish()
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl ProbingTable<crate::DefaultHashBuilder> {
    /// Creates a table with [`TableConfig::default`] and the default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// #
    /// let table = ProbingTable::new();
    /// assert_eq!(table.capacity(), 11);
    /// assert_eq!(table.max_load_factor(), 0.7);
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Creates a table from `config` with the default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// # use quad_probe::TableConfig;
    /// #
    /// let table = ProbingTable::with_config(TableConfig::default().with_initial_capacity(53))?;
    /// assert_eq!(table.capacity(), 53);
    /// # Ok::<(), quad_probe::ConfigError>(())
    /// ```
    pub fn with_config(config: TableConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<S> Default for ProbingTable<S>
where
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<S> ProbingTable<S> {
    /// Number of live entries. Tombstones are not counted.
    pub fn count(&self) -> usize {
        self.live
    }

    /// Alias for [`count`](Self::count).
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// `count() / capacity()`.
    pub fn load_factor(&self) -> f64 {
        self.live as f64 / self.slots.len() as f64
    }

    /// The configured bound on [`load_factor`](Self::load_factor).
    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Number of tombstones left by deletes since the last rebuild.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Number of times the table has grown.
    pub fn resizes(&self) -> usize {
        self.resizes
    }

    /// Returns an iterator over every slot, in slot order, with its index.
    ///
    /// The iterator is cheap to clone, and calling `slots` again starts a
    /// fresh pass.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// #
    /// let mut table = ProbingTable::new();
    /// table.insert("eevee", "normal")?;
    ///
    /// assert_eq!(table.slots().len(), table.capacity());
    /// assert_eq!(table.slots().filter(|(_, slot)| slot.is_occupied()).count(), 1);
    /// # Ok::<(), quad_probe::TableError>(())
    /// ```
    pub fn slots(&self) -> Slots<'_> {
        Slots {
            inner: self.slots.iter().enumerate(),
        }
    }

    /// Returns an iterator over the live `(key, value)` pairs in slot order.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            inner: self.slots.iter(),
            remaining: self.live,
        }
    }

    /// Returns a [`Display`](fmt::Display) adapter that prints one line per
    /// slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// # use quad_probe::TableConfig;
    /// #
    /// let table = ProbingTable::with_config(TableConfig::default().with_initial_capacity(2))?;
    /// assert_eq!(table.dump().to_string(), "Slot 0: [Empty]\nSlot 1: [Empty]\n");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn dump(&self) -> Dump<'_> {
        Dump { slots: &self.slots }
    }
}

impl<S> ProbingTable<S>
where
    S: BuildHasher,
{
    /// Creates a table with [`TableConfig::default`] and the given hasher
    /// builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        let config = TableConfig::default();
        Self::from_parts(config, hash_builder)
    }

    /// Creates a table from `config` and the given hasher builder.
    ///
    /// The hasher must be deterministic for the lifetime of the table. Keys
    /// are hashed once per operation and the hash is reduced modulo the
    /// current capacity.
    pub fn with_config_and_hasher(config: TableConfig, hash_builder: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(config, hash_builder))
    }

    fn from_parts(config: TableConfig, hash_builder: S) -> Self {
        Self {
            slots: alloc::vec![Slot::Empty; config.initial_capacity],
            live: 0,
            tombstones: 0,
            resizes: 0,
            max_load_factor: config.max_load_factor,
            hash_builder,
        }
    }

    #[inline]
    fn hash_key(&self, key: &str) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn fits(&self, live: usize, capacity: usize) -> bool {
        live as f64 / capacity as f64 <= self.max_load_factor
    }

    /// Inserts `value` under the normalized form of `key`.
    ///
    /// If the key is already present the stored value is kept and
    /// [`Insertion::Duplicate`] is returned. Both outcomes leave
    /// [`load_factor`](Self::load_factor) at or below
    /// [`max_load_factor`](Self::max_load_factor).
    ///
    /// The load check runs before the key is looked for, so a duplicate
    /// insert made while the table is at its load bound still grows the
    /// table even though no entry is added.
    ///
    /// # Errors
    ///
    /// Fails only if the table needed to grow and the larger backing sequence
    /// could not be allocated. The table is unchanged in that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::Insertion;
    /// # use quad_probe::ProbingTable;
    /// #
    /// let mut table = ProbingTable::new();
    /// assert!(table.insert("Mew", "psychic")?.inserted());
    ///
    /// let again = table.insert("mew", "legendary")?;
    /// assert!(again.is_duplicate() && again.succeeded());
    /// assert_eq!(table.lookup("mew"), Some("psychic"));
    /// # Ok::<(), quad_probe::TableError>(())
    /// ```
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<Insertion, TableError> {
        let key = normalize_key(key);
        if !self.fits(self.live + 1, self.capacity()) {
            self.grow(self.live + 1)?;
        }

        let hash = self.hash_key(&key);
        loop {
            match find_insert_index(&self.slots, hash, &key) {
                InsertProbe::Found(index) => {
                    warn!("duplicate entry detected: {key} (slot {index})");
                    return Ok(Insertion::Duplicate);
                }
                InsertProbe::Vacant(index) => {
                    if self.slots[index].is_tombstone() {
                        self.tombstones -= 1;
                    }
                    trace!("insert {key} at slot {index}");
                    self.slots[index] = Slot::Occupied {
                        key: Cow::into_owned(key),
                        value: value.into(),
                    };
                    self.live += 1;
                    return Ok(Insertion::Inserted);
                }
                InsertProbe::Exhausted => {
                    debug!(
                        "probe sequence for {key} exhausted at capacity {}",
                        self.capacity()
                    );
                    self.grow(self.live + 1)?;
                }
            }
        }
    }

    /// Returns the value stored under the normalized form of `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// #
    /// let mut table = ProbingTable::new();
    /// table.insert("Snorlax", "normal")?;
    /// assert_eq!(table.lookup("  SNORLAX"), Some("normal"));
    /// assert_eq!(table.lookup("munchlax"), None);
    /// # Ok::<(), quad_probe::TableError>(())
    /// ```
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        let index = find_index(&self.slots, self.hash_key(&key), &key)?;
        self.slots[index].entry().map(|(_, value)| value)
    }

    /// Returns `true` if the normalized form of `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Deletes the entry stored under the normalized form of `key`, leaving a
    /// tombstone in its slot. Returns `false` if the key was not present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use quad_probe::ProbingTable;
    /// #
    /// let mut table = ProbingTable::new();
    /// table.insert("ditto", "normal")?;
    /// assert!(table.delete("Ditto"));
    /// assert!(!table.delete("ditto"));
    /// assert_eq!(table.tombstones(), 1);
    /// # Ok::<(), quad_probe::TableError>(())
    /// ```
    pub fn delete(&mut self, key: &str) -> bool {
        let key = normalize_key(key);
        let Some(index) = find_index(&self.slots, self.hash_key(&key), &key) else {
            return false;
        };

        trace!("delete {key} at slot {index}");
        self.slots[index] = Slot::Tombstone;
        self.live -= 1;
        self.tombstones += 1;
        true
    }

    /// Rebuilds the table at the smallest doubling of the current capacity
    /// that holds `required` entries within the load bound and in which every
    /// live entry can be placed.
    ///
    /// Nothing is committed until the rebuilt sequence is complete.
    fn grow(&mut self, required: usize) -> Result<(), TableError> {
        let old_capacity = self.capacity();
        let mut capacity = old_capacity;
        loop {
            capacity = capacity
                .checked_mul(2)
                .ok_or(TableError::CapacityOverflow)?;
            if !self.fits(required, capacity) {
                continue;
            }

            if let Some(slots) = self.rehash(capacity)? {
                debug!(
                    "resized table from {old_capacity} to {capacity} slots ({} entries, {} tombstones dropped)",
                    self.live, self.tombstones
                );
                self.slots = slots;
                self.tombstones = 0;
                self.resizes += 1;
                return Ok(());
            }

            debug!("rehash into {capacity} slots left an entry unplaced, doubling again");
        }
    }

    /// Builds a new slot sequence of `capacity` holding every live entry.
    ///
    /// Placement runs in two passes so a failure leaves `self.slots` intact:
    /// the first pass reserves a target slot for each entry in slot order, the
    /// second moves the entries. Returns `Ok(None)` when some entry's probe
    /// sequence has no free slot at this capacity.
    fn rehash(&mut self, capacity: usize) -> Result<Option<Vec<Slot>>, TableError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| TableError::AllocationFailed { capacity })?;
        slots.resize_with(capacity, Slot::default);

        let mut targets = Vec::new();
        targets
            .try_reserve_exact(self.live)
            .map_err(|_| TableError::AllocationFailed { capacity })?;

        for (key, _) in self.entries() {
            let hash = self.hash_key(key);
            let Some(index) = ProbeSeq::new(hash, capacity).find(|&index| slots[index].is_empty()) else {
                return Ok(None);
            };
            // Placeholder until the entry is moved in below.
            slots[index] = Slot::Tombstone;
            targets.push(index);
        }

        let occupied = self.slots.iter_mut().filter(|slot| slot.is_occupied());
        for (slot, index) in occupied.zip(targets) {
            slots[index] = core::mem::take(slot);
        }

        Ok(Some(slots))
    }

    /// Returns, for each probe attempt `p`, how many live entries sit at
    /// attempt `p` of their own probe sequence.
    ///
    /// The returned vector ends at the longest attempt in use; it is empty for
    /// an empty table.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        for (index, slot) in self.slots.iter().enumerate() {
            let Some((key, _)) = slot.entry() else {
                continue;
            };

            let attempt = ProbeSeq::new(self.hash_key(key), self.capacity())
                .position(|candidate| candidate == index)
                .unwrap_or(self.capacity());
            if hist.len() <= attempt {
                hist.resize(attempt + 1, 0);
            }
            hist[attempt] += 1;
        }

        hist
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        let total_attempts: usize = hist.iter().enumerate().map(|(p, n)| p * n).sum();

        DebugStats {
            live: self.live,
            tombstones: self.tombstones,
            empty: self.capacity() - self.live - self.tombstones,
            capacity: self.capacity(),
            resizes: self.resizes,
            load_factor: self.load_factor(),
            slot_utilization: (self.live + self.tombstones) as f64 / self.capacity() as f64,
            max_probe_len: hist.len().saturating_sub(1),
            mean_probe_len: if self.live == 0 {
                0.0
            } else {
                total_attempts as f64 / self.live as f64
            },
        }
    }
}

/// Utilization statistics returned by [`ProbingTable::debug_stats`].
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub live: usize,
    /// Number of tombstones
    pub tombstones: usize,
    /// Number of empty slots
    pub empty: usize,
    /// Total number of slots
    pub capacity: usize,
    /// Number of growth events so far
    pub resizes: usize,
    /// live / capacity
    pub load_factor: f64,
    /// (live + tombstones) / capacity
    pub slot_utilization: f64,
    /// Longest probe attempt used by a live entry
    pub max_probe_len: usize,
    /// Average probe attempt of live entries
    pub mean_probe_len: f64,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Probing Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.live,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Slot Usage: {} live, {} tombstones, {} empty ({:.2}% utilization)",
            self.live,
            self.tombstones,
            self.empty,
            self.slot_utilization * 100.0
        );
        println!("Resizes: {}", self.resizes);
        println!(
            "Probe length: max {}, mean {:.02}",
            self.max_probe_len, self.mean_probe_len
        );
    }
}

/// An iterator over every slot of a [`ProbingTable`] with its index.
///
/// This struct is created by [`ProbingTable::slots`].
#[derive(Debug, Clone)]
pub struct Slots<'a> {
    inner: core::iter::Enumerate<core::slice::Iter<'a, Slot>>,
}

impl<'a> Iterator for Slots<'a> {
    type Item = (usize, &'a Slot);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Slots<'_> {}

impl FusedIterator for Slots<'_> {}

/// An iterator over the live entries of a [`ProbingTable`].
///
/// This struct is created by [`ProbingTable::entries`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    inner: core::slice::Iter<'a, Slot>,
    remaining: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let entry = self.inner.by_ref().find_map(Slot::entry)?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl FusedIterator for Entries<'_> {}

/// Formats every slot of a [`ProbingTable`] on its own line.
///
/// This struct is created by [`ProbingTable::dump`].
pub struct Dump<'a> {
    slots: &'a [Slot],
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, slot) in self.slots.iter().enumerate() {
            writeln!(f, "Slot {index}: {slot}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use hashbrown::HashMap;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone, Default)]
    struct SipHashBuilder;

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new()
        }
    }

    /// Hashes a key to the number formed by its ASCII digits, so tests can
    /// pick home slots directly: `"a22"` hashes to 22.
    #[derive(Clone, Default)]
    struct DigitHashBuilder;

    #[derive(Default)]
    struct DigitHasher(u64);

    impl Hasher for DigitHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                if b.is_ascii_digit() {
                    self.0 = self.0 * 10 + u64::from(b - b'0');
                }
            }
        }

        fn finish(&self) -> u64 {
            self.0
        }
    }

    impl BuildHasher for DigitHashBuilder {
        type Hasher = DigitHasher;

        fn build_hasher(&self) -> Self::Hasher {
            DigitHasher::default()
        }
    }

    fn digit_table(initial_capacity: usize, max_load_factor: f64) -> ProbingTable<DigitHashBuilder> {
        let config = TableConfig::default()
            .with_initial_capacity(initial_capacity)
            .with_max_load_factor(max_load_factor);
        ProbingTable::with_config_and_hasher(config, DigitHashBuilder).unwrap()
    }

    #[test]
    fn probe_sequence_is_quadratic() {
        let visited: Vec<usize> = ProbeSeq::new(3, 11).take(6).collect();
        assert_eq!(visited, vec![3, 4, 7, 1, 8, 6]);
        assert_eq!(ProbeSeq::new(3, 11).count(), 11);
    }

    #[test]
    fn probe_sequence_misses_slots_for_composite_capacity() {
        let mut reached: Vec<usize> = ProbeSeq::new(0, 4).collect();
        reached.sort_unstable();
        reached.dedup();
        assert_eq!(reached, vec![0, 1]);
    }

    #[test]
    fn insert_and_lookup() {
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        for k in 0..32 {
            let key = format!("key{k}");
            let outcome = table.insert(&key, format!("value{k}")).unwrap();
            assert_eq!(outcome, Insertion::Inserted, "{table:#?}");
            assert_eq!(table.lookup(&key), Some(format!("value{k}").as_str()));
        }

        assert_eq!(table.count(), 32);
        for k in 0..32 {
            assert_eq!(
                table.lookup(&format!("key{k}")),
                Some(format!("value{k}").as_str()),
                "{table:#?}"
            );
        }
        assert_eq!(table.lookup("key999"), None);
    }

    #[test]
    fn keys_are_normalized() {
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        table.insert("  Bulbasaur\t", "grass").unwrap();

        assert_eq!(table.lookup("bulbasaur"), Some("grass"));
        assert_eq!(table.lookup("BULBASAUR  "), Some("grass"));
        assert_eq!(table.entries().next(), Some(("bulbasaur", "grass")));
        assert!(table.delete(" bulbaSAUR"));
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_insert_keeps_first_value() {
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        assert_eq!(table.insert("onix", "rock").unwrap(), Insertion::Inserted);

        let outcome = table.insert("ONIX", "ground").unwrap();
        assert_eq!(outcome, Insertion::Duplicate);
        assert!(outcome.succeeded());
        assert!(!outcome.inserted());
        assert_eq!(table.count(), 1);
        assert_eq!(table.lookup("onix"), Some("rock"));
    }

    #[test]
    fn delete_then_reinsert() {
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        table.insert("gengar", "ghost").unwrap();

        assert!(table.delete("gengar"));
        assert_eq!(table.lookup("gengar"), None);
        assert!(!table.delete("gengar"));
        assert_eq!(table.count(), 0);

        assert_eq!(table.insert("gengar", "poison").unwrap(), Insertion::Inserted);
        assert_eq!(table.lookup("gengar"), Some("poison"));
        assert_eq!(table.count(), 1);
    }

    #[test]
    fn tombstone_does_not_block_lookup() {
        let mut table = digit_table(11, 0.7);
        // All three share home slot 0 and land on attempts 0, 1 and 2.
        table.insert("a0", "first").unwrap();
        table.insert("b11", "second").unwrap();
        table.insert("c22", "third").unwrap();
        assert_eq!(table.slots().nth(4).unwrap().1.entry(), Some(("c22", "third")));

        assert!(table.delete("a0"));
        assert!(table.slots().next().unwrap().1.is_tombstone());
        assert_eq!(table.lookup("c22"), Some("third"));
        assert_eq!(table.lookup("b11"), Some("second"));
        assert_eq!(table.lookup("a0"), None);
        assert!(table.delete("c22"));
        assert_eq!(table.lookup("b11"), Some("second"));
    }

    #[test]
    fn duplicate_past_tombstone_is_detected() {
        let mut table = digit_table(11, 0.7);
        table.insert("a0", "first").unwrap();
        table.insert("b11", "second").unwrap();
        table.delete("a0");

        // Slot 0 is reusable, but the key already lives at slot 1.
        assert_eq!(table.insert("B11", "again").unwrap(), Insertion::Duplicate);
        assert_eq!(table.count(), 1);
        assert_eq!(table.slots().filter(|(_, s)| s.is_occupied()).count(), 1);
        assert_eq!(table.lookup("b11"), Some("second"));
    }

    #[test]
    fn insert_reuses_first_tombstone() {
        let mut table = digit_table(11, 0.7);
        table.insert("a0", "first").unwrap();
        table.delete("a0");
        assert_eq!(table.tombstones(), 1);

        table.insert("d33", "fourth").unwrap();
        assert_eq!(table.slots().next().unwrap().1.entry(), Some(("d33", "fourth")));
        assert_eq!(table.tombstones(), 0);
    }

    #[test]
    fn eighth_key_triggers_single_resize() {
        let mut table = digit_table(11, 0.7);
        for k in 0..7 {
            table.insert(&format!("k{k}"), "v").unwrap();
        }
        assert_eq!(table.capacity(), 11);
        assert_eq!(table.resizes(), 0);

        table.insert("k7", "v").unwrap();
        assert_eq!(table.capacity(), 22);
        assert_eq!(table.resizes(), 1);
        assert!(table.load_factor() <= table.max_load_factor());
        for k in 0..8 {
            assert_eq!(table.lookup(&format!("k{k}")), Some("v"));
        }
    }

    #[test]
    fn resize_drops_tombstones() {
        let mut table = digit_table(11, 0.7);
        for k in 0..7 {
            table.insert(&format!("k{k}"), "v").unwrap();
        }
        table.delete("k1");
        table.delete("k2");
        table.insert("k1", "back").unwrap();
        assert_eq!(table.tombstones(), 1);

        table.insert("k7", "v").unwrap();
        table.insert("k8", "v").unwrap();
        assert_eq!(table.resizes(), 1, "{table:#?}");
        assert_eq!(table.tombstones(), 0);
        assert!(!table.slots().any(|(_, slot)| slot.is_tombstone()));
        assert_eq!(table.lookup("k1"), Some("back"));
        assert_eq!(table.lookup("k2"), None);
        assert_eq!(table.count(), 8);
    }

    #[test]
    fn exhausted_probe_sequence_grows_table() {
        let mut table = digit_table(4, 0.9);
        table.insert("k0", "a").unwrap();
        table.insert("k4", "b").unwrap();
        assert_eq!(table.capacity(), 4);

        // Home slot 0 of a 4-slot table only reaches slots 0 and 1.
        table.insert("k8", "c").unwrap();
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.resizes(), 1);
        for (key, value) in [("k0", "a"), ("k4", "b"), ("k8", "c")] {
            assert_eq!(table.lookup(key), Some(value), "{table:#?}");
        }
    }

    #[test]
    fn growth_reaches_load_bound_from_tiny_table() {
        let mut table = digit_table(1, 0.1);
        table.insert("k1", "v").unwrap();
        assert!(table.load_factor() <= 0.1, "{table:#?}");
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.resizes(), 1);
    }

    #[test]
    fn colliding_keys_survive_repeated_growth() {
        let mut table = digit_table(11, 0.7);
        // No digits, so every key hashes to 0.
        let keys: Vec<String> = (b'a'..=b'z').map(|c| format!("{}{}", c as char, c as char)).collect();
        for key in &keys {
            assert_eq!(table.insert(key, key.as_str()).unwrap(), Insertion::Inserted);
            assert!(table.load_factor() <= table.max_load_factor());
        }

        assert_eq!(table.count(), keys.len());
        for key in &keys {
            assert_eq!(table.lookup(key), Some(key.as_str()), "{table:#?}");
        }
    }

    #[test]
    fn walks_stop_when_every_slot_is_a_tombstone() {
        let mut table = digit_table(11, 0.7);
        for round in 0..2 {
            let keys: Vec<String> = (round * 7..round * 7 + 7).map(|k| format!("k{k}")).collect();
            for key in &keys {
                table.insert(key, "v").unwrap();
            }
            for key in &keys {
                assert!(table.delete(key));
            }
        }
        assert_eq!(table.capacity(), 11);
        assert_eq!(table.tombstones(), 11, "{table:#?}");
        assert!(table.slots().all(|(_, slot)| slot.is_tombstone()));

        assert_eq!(table.lookup("k99"), None);
        assert_eq!(table.lookup("missing"), None);
        assert!(!table.delete("k0"));

        assert_eq!(table.insert("k5", "back").unwrap(), Insertion::Inserted);
        assert_eq!(table.capacity(), 11);
        assert_eq!(table.resizes(), 0);
        assert_eq!(table.tombstones(), 10);
        assert_eq!(table.slots().nth(5).unwrap().1.entry(), Some(("k5", "back")));
        assert_eq!(table.lookup("k5"), Some("back"));
    }

    #[test]
    fn failed_rehash_leaves_table_untouched() {
        let mut table = digit_table(8, 0.9);
        // Home slot 0 for all three: attempts 0, 1 and 2 land on slots 0, 1, 4.
        table.insert("k0", "a").unwrap();
        table.insert("k8", "b").unwrap();
        table.insert("k16", "c").unwrap();
        table.insert("k3", "d").unwrap();
        table.delete("k3");
        let before: Vec<Slot> = table.slots().map(|(_, slot)| slot.clone()).collect();

        // At 4 slots home 0 only reaches slots 0 and 1.
        assert_eq!(table.rehash(4), Ok(None));
        let after: Vec<Slot> = table.slots().map(|(_, slot)| slot.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(table.count(), 3);
        assert_eq!(table.tombstones(), 1);
        assert_eq!(table.capacity(), 8);
        for (key, value) in [("k0", "a"), ("k8", "b"), ("k16", "c")] {
            assert_eq!(table.lookup(key), Some(value));
        }
    }

    #[test]
    fn grow_skips_capacity_that_cannot_place_every_entry() {
        let mut table = digit_table(3, 0.9);
        for key in ["k11", "k8", "k23", "k24", "k39"] {
            table.insert(key, key).unwrap();
        }
        assert_eq!(table.capacity(), 6);
        assert_eq!(table.resizes(), 1);

        // Every slot k35 can reach at 6 slots is taken, and at 12 slots the
        // rebuilt k11 can only reach slots already claimed by earlier entries.
        assert_eq!(table.rehash(12), Ok(None));
        assert_eq!(table.insert("k35", "k35").unwrap(), Insertion::Inserted);
        assert_eq!(table.capacity(), 24, "{table:#?}");
        assert_eq!(table.resizes(), 2);
        for key in ["k11", "k8", "k23", "k24", "k39", "k35"] {
            assert_eq!(table.lookup(key), Some(key), "{table:#?}");
        }
    }

    #[test]
    fn duplicate_insert_at_load_bound_still_grows() {
        let mut table = digit_table(11, 0.7);
        for k in 0..7 {
            table.insert(&format!("k{k}"), "v").unwrap();
        }
        assert_eq!(table.capacity(), 11);

        assert_eq!(table.insert("K3", "other").unwrap(), Insertion::Duplicate);
        assert_eq!(table.capacity(), 22);
        assert_eq!(table.resizes(), 1);
        assert_eq!(table.count(), 7);
        assert_eq!(table.lookup("k3"), Some("v"));
    }

    #[test]
    fn slots_are_restartable_and_dump_formats() {
        let mut table = digit_table(3, 0.7);
        table.insert("a0", "x").unwrap();
        table.insert("b1", "y").unwrap();
        table.delete("b1");

        let slots = table.slots();
        let first: Vec<_> = slots.clone().collect();
        let second: Vec<_> = slots.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        assert_eq!(table.dump().to_string(), "Slot 0: a0 : x\nSlot 1: [Deleted]\nSlot 2: [Empty]\n");
    }

    #[test]
    fn entries_skip_empty_and_tombstones() {
        let mut table = digit_table(11, 0.7);
        table.insert("a3", "x").unwrap();
        table.insert("b5", "y").unwrap();
        table.insert("c7", "z").unwrap();
        table.delete("b5");

        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.collect::<Vec<_>>(), vec![("a3", "x"), ("c7", "z")]);
    }

    #[test]
    fn debug_stats_reflect_contents() {
        let mut table = digit_table(11, 0.7);
        table.insert("a0", "x").unwrap();
        table.insert("b11", "y").unwrap();
        table.insert("c22", "z").unwrap();
        table.insert("d5", "w").unwrap();
        table.delete("d5");

        assert_eq!(table.probe_histogram(), vec![1, 1, 1]);
        let stats = table.debug_stats();
        assert_eq!(stats.live, 3);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(stats.empty, 7);
        assert_eq!(stats.max_probe_len, 2);
        assert!((stats.mean_probe_len - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clone_is_independent() {
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        table.insert("lapras", "water").unwrap();

        let mut copy = table.clone();
        copy.delete("lapras");
        assert_eq!(table.lookup("lapras"), Some("water"));
        assert_eq!(copy.lookup("lapras"), None);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn randomized_against_model() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut table = ProbingTable::with_hasher(SipHashBuilder);
        let mut model: HashMap<String, String> = HashMap::new();

        for step in 0..20_000 {
            let id = rng.random_range(0..600);
            let key = if rng.random_bool(0.5) {
                format!("  Key{id} ")
            } else {
                format!("key{id}")
            };
            let canonical = format!("key{id}");

            match rng.random_range(0..3) {
                0 | 1 => {
                    let value = step.to_string();
                    let outcome = table.insert(&key, value.clone()).unwrap();
                    let expected = if model.contains_key(&canonical) {
                        Insertion::Duplicate
                    } else {
                        model.insert(canonical, value);
                        Insertion::Inserted
                    };
                    assert_eq!(outcome, expected);
                    assert!(table.load_factor() <= table.max_load_factor());
                }
                _ => {
                    assert_eq!(table.delete(&key), model.remove(&canonical).is_some());
                }
            }
            assert_eq!(table.count(), model.len());
        }

        assert!(table.resizes() > 0);
        for (key, value) in &model {
            assert_eq!(table.lookup(key), Some(value.as_str()));
        }
        let mut seen = 0;
        for (key, value) in table.entries() {
            assert_eq!(model.get(key).map(String::as_str), Some(value));
            seen += 1;
        }
        assert_eq!(seen, model.len());
    }
}
