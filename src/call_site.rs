use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Longest format string the one-byte length field can describe.
pub const MAX_FORMAT_LEN: usize = u8::MAX as usize;

/// Most arguments the one-byte argument count can describe.
pub const MAX_ARG_COUNT: usize = u8::MAX as usize;

const EMPTY: u64 = 0;

/// Per-call-site cache of the index a logger assigned to this site's format
/// string.
///
/// [`log_record!`](crate::log_record) declares one `static CallSite` per
/// expansion. The first time a logger reaches the site it resolves the format
/// string through its table and stores `(logger id, index)` here; subsequent
/// calls by the same logger skip the table lookup. The cell holds the entry of
/// the last logger that resolved it, so several loggers sharing a site only
/// fall back to their own tables, never to a wrong index.
///
/// Indices above `u32::MAX` are not cached.
///
/// `CallSite::new` enforces the format string length limit. In a `static`
/// initializer the check runs at compile time:
///
/// ```compile_fail
/// static SITE: binary_log::CallSite = binary_log::CallSite::new(
///     "0123456789012345678901234567890123456789012345678901234567890123456789\
///      0123456789012345678901234567890123456789012345678901234567890123456789\
///      0123456789012345678901234567890123456789012345678901234567890123456789\
///      012345678901234567890123456789012345678901234567890123456789012345678",
/// );
/// ```
#[derive(Debug)]
pub struct CallSite {
    format: &'static str,
    // logger id in the high half, index in the low half; 0 when empty
    cache: AtomicU64,
}

impl CallSite {
    pub const fn new(format: &'static str) -> Self {
        assert!(
            format.len() <= MAX_FORMAT_LEN,
            "format string longer than 255 bytes"
        );
        Self {
            format,
            cache: AtomicU64::new(EMPTY),
        }
    }

    #[inline(always)]
    pub fn format(&self) -> &'static str {
        self.format
    }

    /// Index cached for `logger_id`, if this site was last resolved by it.
    #[inline(always)]
    pub fn cached(&self, logger_id: u32) -> Option<u64> {
        if logger_id == 0 {
            return None;
        }
        let packed = self.cache.load(Ordering::Relaxed);
        if (packed >> 32) as u32 == logger_id {
            Some(packed & u64::from(u32::MAX))
        } else {
            None
        }
    }

    #[inline]
    pub fn store(&self, logger_id: u32, index: u64) {
        if logger_id == 0 || index > u64::from(u32::MAX) {
            return;
        }
        self.cache
            .store((u64::from(logger_id) << 32) | index, Ordering::Relaxed);
    }
}

static NEXT_LOGGER_ID: AtomicU32 = AtomicU32::new(1);

/// Allocates a process-unique logger id for call site caching.
///
/// Returns 0, which disables caching for that logger, once the id space is
/// used up.
pub(crate) fn next_logger_id() -> u32 {
    NEXT_LOGGER_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_is_per_logger() {
        static SITE: CallSite = CallSite::new("x={}");
        assert_eq!(SITE.format(), "x={}");
        assert_eq!(SITE.cached(7), None);

        SITE.store(7, 3);
        assert_eq!(SITE.cached(7), Some(3));
        assert_eq!(SITE.cached(8), None);

        SITE.store(8, 0);
        assert_eq!(SITE.cached(8), Some(0));
        assert_eq!(SITE.cached(7), None);
    }

    #[test]
    fn test_uncacheable_entries() {
        let site = CallSite::new("y");
        site.store(0, 1);
        assert_eq!(site.cached(0), None);
        site.store(5, u64::from(u32::MAX) + 1);
        assert_eq!(site.cached(5), None);
    }

    #[test]
    fn test_logger_ids_are_unique() {
        let a = next_logger_id();
        let b = next_logger_id();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_format_length_boundary() {
        let ok: &'static str = Box::leak("a".repeat(MAX_FORMAT_LEN).into_boxed_str());
        assert_eq!(CallSite::new(ok).format().len(), 255);

        let too_long: &'static str = Box::leak("a".repeat(MAX_FORMAT_LEN + 1).into_boxed_str());
        let result = std::panic::catch_unwind(|| CallSite::new(too_long));
        assert!(result.is_err(), "256-byte format string should be rejected");
    }
}
