use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    pub objects: usize,
    pub keylist_copies: usize,
    pub self_splices: usize,
    pub audited_cycles: usize,
}

static OBJECTS: AtomicUsize = AtomicUsize::new(0);
static KEYLIST_COPIES: AtomicUsize = AtomicUsize::new(0);
static SELF_SPLICES: AtomicUsize = AtomicUsize::new(0);
static AUDITED_CYCLES: AtomicUsize = AtomicUsize::new(0);

pub fn record_object() {
    OBJECTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_keylist_copy() {
    KEYLIST_COPIES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_self_splice() {
    SELF_SPLICES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_audited_cycle() {
    AUDITED_CYCLES.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> RuntimeStats {
    RuntimeStats {
        objects: OBJECTS.load(Ordering::Relaxed),
        keylist_copies: KEYLIST_COPIES.load(Ordering::Relaxed),
        self_splices: SELF_SPLICES.load(Ordering::Relaxed),
        audited_cycles: AUDITED_CYCLES.load(Ordering::Relaxed),
    }
}
