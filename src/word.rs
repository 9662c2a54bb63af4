use core::fmt;
use core::num::NonZeroU32;
use core::sync::atomic::Ordering;

use crate::cfg::atomic::AtomicU32;

/// The identity of a thread interacting with a monitor.
///
/// Identities are small non-zero integers that callers assign and are
/// responsible for keeping unique per live thread. Zero is reserved as the
/// "unlocked" sentinel and is rejected at construction.
///
/// The thin encoding stores identities in a 13-bit field, so ids greater
/// than [`ThreadId::THIN_MAX`] are only usable with the fat encoding; a thin
/// monitor treats them as a fatal capacity violation.
///
/// # Examples
///
/// ```
/// use monlock::ThreadId;
///
/// assert!(ThreadId::new(0).is_none());
/// assert_eq!(ThreadId::new(42).unwrap().get(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ThreadId(NonZeroU32);

impl ThreadId {
    /// The greatest identity value that fits the thin encoding's owner field.
    pub const THIN_MAX: u32 = OWNER_MASK;

    /// Creates a new `ThreadId` if the given value is not zero.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Option<Self> {
        match NonZeroU32::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Returns the identity as a primitive value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Offset of the owner field within the word.
const OWNER_SHIFT: u32 = 3;
/// Mask of the owner field, once shifted down.
const OWNER_MASK: u32 = 0x1fff;
/// Offset of the nest field within the word.
const NEST_SHIFT: u32 = 16;
/// Greatest nest count the word can represent.
const NEST_MAX: u32 = 0xffff;

/// A decoded-on-demand snapshot of a monitor word.
///
/// The word packs the nest count in its high halfword and the owner identity
/// in a 13-bit field above three reserved tag bits. A zero nest field means
/// the monitor is unlocked. The raw encoding never leaves this module's
/// types: monitors hand out decoded values only.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Word(u32);

impl Word {
    /// The word of a monitor no thread holds.
    pub const UNLOCKED: Self = Self(0);

    /// Packs an owner identity and a nest count into a word.
    ///
    /// Both fields are checked: a value that does not fit its field is a
    /// capacity violation and aborts the thread, it is never truncated into
    /// the neighboring field.
    pub fn pack(owner: ThreadId, nest: u32) -> Self {
        let true = owner.get() <= OWNER_MASK else { panic_owner_width(owner) };
        let true = nest <= NEST_MAX else { panic_nest_width() };
        Self((nest << NEST_SHIFT) | (owner.get() << OWNER_SHIFT))
    }

    /// Returns the owner field, zero when unlocked.
    pub const fn owner_bits(self) -> u32 {
        self.0 >> OWNER_SHIFT & OWNER_MASK
    }

    /// Returns the owning thread's identity, if any.
    pub const fn holder(self) -> Option<ThreadId> {
        ThreadId::new(self.owner_bits())
    }

    /// Returns the nest count; zero means unlocked.
    pub const fn nest(self) -> u32 {
        self.0 >> NEST_SHIFT
    }

    /// Returns `true` if `id` is the current owner.
    pub fn held_by(self, id: ThreadId) -> bool {
        self.owner_bits() == id.get()
    }

    /// Returns the raw encoded value, for compare-and-swap and futex use.
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    /// Reconstructs a word from its raw encoded value.
    const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// The single atomic cell backing a thin monitor.
///
/// All cross-thread access goes through the compare-and-swap claim; plain
/// stores are reserved for the current owner, which is the only thread
/// allowed to mutate the word while the lock is held.
pub(crate) struct SyncWord {
    state: AtomicU32,
}

impl SyncWord {
    /// Creates a new unlocked word (const).
    #[cfg(not(all(loom, test)))]
    pub const fn new() -> Self {
        Self { state: AtomicU32::new(0) }
    }

    /// Creates a new unlocked word with Loom primitives (non-const).
    #[cfg(all(loom, test))]
    pub fn new() -> Self {
        Self { state: AtomicU32::new(0) }
    }

    /// Loads and decodes the current word.
    pub fn load(&self, order: Ordering) -> Word {
        Word::from_raw(self.state.load(order))
    }

    /// Attempts to move the word from `current` to `new`, acquiring the
    /// monitor on success. Returns the conflicting word on failure.
    pub fn try_claim(&self, current: Word, new: Word) -> Result<(), Word> {
        self.state
            .compare_exchange(current.into_raw(), new.into_raw(), Ordering::Acquire, Ordering::Relaxed)
            .map(|_| ())
            .map_err(Word::from_raw)
    }

    /// Attempts to move the word from `current` to `new` with release
    /// ordering, for exit paths that defend against concurrent mutation.
    pub fn try_swap_release(&self, current: Word, new: Word) -> Result<(), Word> {
        self.state
            .compare_exchange(current.into_raw(), new.into_raw(), Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(Word::from_raw)
    }

    /// Stores a whole word.
    ///
    /// Callers must be the current owner: while the lock is held no other
    /// thread writes the word, and concurrent claimers re-read and retry on
    /// any value they observe.
    pub fn store(&self, word: Word, order: Ordering) {
        self.state.store(word.into_raw(), order);
    }

    /// Stores the nest field alone, leaving the owner half untouched.
    ///
    /// Callers must be the current owner; the single-writer-while-held
    /// invariant is what makes an independent sub-word store sound, since no
    /// concurrent writer can exist for the other half.
    #[cfg(not(all(loom, test)))]
    pub fn store_nest_half(&self, nest: u16) {
        use core::sync::atomic::AtomicU16;
        // The nest field occupies bits 16..32 of the word.
        const OFFSET: usize = if cfg!(target_endian = "little") { 2 } else { 0 };
        let ptr = self.state.as_ptr().cast::<u8>();
        // SAFETY: The nest halfword lies within the cell's allocation at a
        // 2-aligned offset, and only the lock owner issues this store.
        let half = unsafe { &*ptr.add(OFFSET).cast::<AtomicU16>() };
        half.store(nest, Ordering::Release);
    }

    /// Returns the backing atomic, for waiting policies to spin or sleep on.
    pub fn state(&self) -> &AtomicU32 {
        &self.state
    }
}

/// Panics the thread with the id that overflows the owner field.
#[inline(never)]
#[cold]
fn panic_owner_width(owner: ThreadId) -> ! {
    panic!("thread id {} does not fit the thin monitor's owner field", owner)
}

/// Panics the thread on a nest count past the field's capacity.
#[inline(never)]
#[cold]
fn panic_nest_width() -> ! {
    panic!("nest count overflows the thin monitor's nest field")
}

#[cfg(all(not(loom), test))]
mod test {
    use super::{SyncWord, ThreadId, Word, NEST_MAX, OWNER_MASK};
    use core::sync::atomic::Ordering::Relaxed;

    #[test]
    fn zero_id_is_rejected() {
        assert!(ThreadId::new(0).is_none());
        assert!(ThreadId::new(1).is_some());
    }

    #[test]
    fn owner_and_nest_round_trip() {
        let owners = [1, 2, 7, 0x1000, OWNER_MASK];
        let nests = [1, 2, 10, 0x100, NEST_MAX];
        for owner in owners.map(|id| ThreadId::new(id).unwrap()) {
            for nest in nests {
                let word = Word::pack(owner, nest);
                assert_eq!(word.holder(), Some(owner));
                assert_eq!(word.nest(), nest);
            }
        }
    }

    #[test]
    fn unlocked_word_is_zero() {
        assert_eq!(Word::UNLOCKED.into_raw(), 0);
        assert_eq!(Word::UNLOCKED.nest(), 0);
        assert_eq!(Word::UNLOCKED.holder(), None);
    }

    #[test]
    #[should_panic(expected = "owner field")]
    fn wide_owner_is_fatal() {
        let wide = ThreadId::new(OWNER_MASK + 1).unwrap();
        let _ = Word::pack(wide, 1);
    }

    #[test]
    #[should_panic(expected = "nest field")]
    fn wide_nest_is_fatal() {
        let owner = ThreadId::new(1).unwrap();
        let _ = Word::pack(owner, NEST_MAX + 1);
    }

    #[test]
    fn halfword_store_updates_nest_only() {
        let owner = ThreadId::new(0x1fff).unwrap();
        let sync = SyncWord::new();
        sync.store(Word::pack(owner, 1), Relaxed);
        sync.store_nest_half(5);
        let word = sync.load(Relaxed);
        assert_eq!(word.holder(), Some(owner));
        assert_eq!(word.nest(), 5);
    }
}
