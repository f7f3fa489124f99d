use openworkers_string_cache::{
    HeapError, HeapLimits, Isolate, ManagedHeap, NativeString, ScriptHeap, StringCache,
};

#[test]
fn test_same_string_same_object() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("hello");

    let first = isolate.external_string(&s).unwrap();
    let second = isolate.external_string(&s).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_rust_string(), "hello");
    assert_eq!(isolate.string_cache().len(), 1);
}

#[test]
fn test_empty_string_bypasses_cache() {
    let mut isolate = Isolate::default();

    let latin1 = isolate.external_string(&NativeString::new("")).unwrap();
    let utf16 = isolate
        .external_string(&NativeString::from_utf16(Vec::<u16>::new()))
        .unwrap();

    assert_eq!(latin1, isolate.empty_string());
    assert_eq!(utf16, isolate.empty_string());
    assert!(isolate.string_cache().is_empty());
    assert_eq!(isolate.heap().statistics().live_objects, 0);
}

#[test]
fn test_reference_count_accounting() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("counted");
    let baseline = s.ref_count();

    let handle = isolate.external_string(&s).unwrap();
    assert_eq!(s.ref_count(), baseline + 1);

    // Repeat lookups do not take more references
    isolate.external_string(&s).unwrap();
    assert_eq!(s.ref_count(), baseline + 1);

    drop(handle);
    isolate.collect_garbage();
    assert_eq!(s.ref_count(), baseline);
    assert_eq!(isolate.string_cache().stats().finalized, 1);
}

#[test]
fn test_live_handle_keeps_entry() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("pinned");

    let handle = isolate.external_string(&s).unwrap();
    assert_eq!(isolate.collect_garbage(), 0);
    assert!(isolate.string_cache().contains(&s));
    assert_eq!(isolate.external_string(&s).unwrap(), handle);
}

#[test]
fn test_finalizer_clears_fast_path() {
    let mut isolate = Isolate::default();
    let a = NativeString::new("alpha");
    let b = NativeString::new("beta");

    drop(isolate.external_string(&a).unwrap());
    isolate.collect_garbage();
    assert!(!isolate.string_cache().contains(&a));

    let hb = isolate.external_string(&b).unwrap();
    assert_eq!(hb.to_rust_string(), "beta");

    let ha = isolate.external_string(&a).unwrap();
    assert_eq!(ha.to_rust_string(), "alpha");
    assert_ne!(ha, hb);
}

#[test]
fn test_explicit_removal_clears_fast_path() {
    let mut isolate = Isolate::default();
    let a = NativeString::new("alpha");
    let b = NativeString::new("beta");

    let ha = isolate.external_string(&a).unwrap();
    assert_eq!(a.ref_count(), 2);

    assert!(isolate.forget_string(a));
    assert!(isolate.string_cache().is_empty());
    assert_eq!(isolate.heap().statistics().weak_handles, 0);

    let hb = isolate.external_string(&b).unwrap();
    assert_ne!(hb, ha);
    assert_eq!(hb.to_rust_string(), "beta");
    assert_eq!(isolate.string_cache().len(), 1);
}

#[test]
fn test_removed_object_outlives_entry() {
    let mut isolate = Isolate::default();
    let a = NativeString::new("alpha");
    let kept_contents = NativeString::new("alpha");

    let ha = isolate.external_string(&a).unwrap();
    assert!(isolate.forget_string(a));

    // Still referenced: survives collection, finalizer was cancelled
    assert_eq!(isolate.collect_garbage(), 0);
    assert_eq!(ha.to_rust_string(), "alpha");
    assert_eq!(isolate.string_cache().stats().finalized, 0);

    // A new buffer with the same contents is a new identity
    let fresh = isolate.external_string(&kept_contents).unwrap();
    assert_ne!(fresh, ha);
    assert_eq!(isolate.string_cache().len(), 1);
    assert_eq!(kept_contents.ref_count(), 2);

    drop(ha);
    assert_eq!(isolate.collect_garbage(), 1);
    assert_eq!(isolate.string_cache().stats().finalized, 0);
    assert_eq!(isolate.external_string(&kept_contents).unwrap(), fresh);
}

#[test]
fn test_forget_uncached_string() {
    let mut isolate = Isolate::default();
    assert!(!isolate.forget_string(NativeString::new("never resolved")));
    assert_eq!(isolate.string_cache().stats().removed, 0);
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "still shared")]
fn test_forget_string_still_in_use() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("in use");
    let _handle = isolate.external_string(&s).unwrap();

    // Another owner could resolve it again and get a second object
    isolate.forget_string(s.clone());
}

#[test]
fn test_single_creation_per_identity() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("once");
    let other = NativeString::new("other");

    let handle = isolate.external_string(&s).unwrap();
    for _ in 0..10 {
        assert_eq!(isolate.external_string(&s).unwrap(), handle);
        isolate.external_string(&other).unwrap();
    }

    let stats = isolate.string_cache().stats();
    assert_eq!(stats.creations, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits + stats.fast_hits, 20);
}

#[test]
fn test_identity_not_contents() {
    let mut isolate = Isolate::default();
    let a = NativeString::new("same");
    let b = NativeString::new("same");

    let ha = isolate.external_string(&a).unwrap();
    let hb = isolate.external_string(&b).unwrap();

    assert_ne!(ha, hb);
    assert_eq!(ha.to_rust_string(), hb.to_rust_string());
    assert_eq!(isolate.string_cache().len(), 2);
}

#[test]
fn test_end_to_end_scenario() {
    let mut isolate = Isolate::default();
    let hello = NativeString::new("hello");
    let baseline = hello.ref_count();

    let h1 = isolate.external_string(&hello).unwrap();
    assert_eq!(isolate.string_cache().len(), 1);
    assert_eq!(hello.ref_count(), baseline + 1);
    let h1_id = h1.id();

    let again = isolate.external_string(&hello).unwrap();
    assert_eq!(again, h1);
    assert_eq!(isolate.string_cache().len(), 1);

    drop(again);
    drop(h1);
    assert_eq!(isolate.collect_garbage(), 1);
    assert_eq!(isolate.string_cache().len(), 0);
    assert_eq!(hello.ref_count(), baseline);

    let h2 = isolate.external_string(&hello).unwrap();
    assert_ne!(h2.id(), h1_id);
    assert_eq!(isolate.string_cache().len(), 1);
    assert_eq!(hello.ref_count(), baseline + 1);
}

#[test]
fn test_allocation_failure() {
    let mut isolate = Isolate::default();
    let x = NativeString::new("x");
    let baseline = x.ref_count();

    isolate.heap_mut().fail_next_allocations(1);

    assert_eq!(
        isolate.external_string(&x),
        Err(HeapError::AllocationFailed)
    );
    assert_eq!(isolate.string_cache().len(), 0);
    assert_eq!(x.ref_count(), baseline);
    assert_eq!(isolate.string_cache().stats().allocation_failures, 1);

    // The next attempt goes through
    assert!(isolate.external_string(&x).is_ok());
    assert_eq!(x.ref_count(), baseline + 1);
}

#[test]
fn test_limit_errors_leave_cache_untouched() {
    let mut isolate = Isolate::new(HeapLimits {
        max_external_bytes: 4,
        ..HeapLimits::default()
    });
    let big = NativeString::new("too big");

    assert!(matches!(
        isolate.external_string(&big),
        Err(HeapError::ExternalMemoryLimit { .. })
    ));
    assert!(isolate.string_cache().is_empty());
    assert_eq!(big.ref_count(), 1);
}

#[test]
fn test_finalizers_during_allocation() {
    // Every allocation past the first collects first, finalizing whatever
    // the caller has let go of while the cache is inserting a new entry.
    let mut isolate = Isolate::new(HeapLimits::with_gc_threshold(1));
    let strings: Vec<NativeString> = (0..5)
        .map(|i| NativeString::new(&format!("s{i}")))
        .collect();

    for s in &strings {
        let handle = isolate.external_string(s).unwrap();
        assert_eq!(handle.to_rust_string(), s.to_string_lossy());
        assert_eq!(isolate.string_cache().len(), 1);
        assert!(isolate.string_cache().contains(s));
    }

    let stats = isolate.string_cache().stats();
    assert_eq!(stats.creations, 5);
    assert_eq!(stats.finalized, 4);

    for s in &strings[..4] {
        assert_eq!(s.ref_count(), 1);
    }
    assert_eq!(strings[4].ref_count(), 2);
}

#[test]
fn test_reentrant_finalizer_for_last_entry() {
    let mut isolate = Isolate::new(HeapLimits::with_gc_threshold(1));
    let a = NativeString::new("a");
    let b = NativeString::new("b");

    // `a` sits in the fast-path slot and is finalized while `b` is created
    drop(isolate.external_string(&a).unwrap());
    let hb = isolate.external_string(&b).unwrap();

    assert!(!isolate.string_cache().contains(&a));
    assert_eq!(isolate.external_string(&b).unwrap(), hb);

    let ha = isolate.external_string(&a).unwrap();
    assert_eq!(ha.to_rust_string(), "a");
    assert_ne!(ha, hb);
}

#[test]
fn test_utf16_strings_stay_two_byte() {
    let mut isolate = Isolate::default();
    let wide = NativeString::new("ünïcödé ✓");
    let narrow = NativeString::new("plain");

    let hw = isolate.external_string(&wide).unwrap();
    let hn = isolate.external_string(&narrow).unwrap();

    assert!(!hw.is_one_byte());
    assert!(hn.is_one_byte());
    assert_eq!(hw.to_rust_string(), "ünïcödé ✓");
    assert_eq!(hw.len(), wide.len());
}

#[test]
fn test_external_string_shares_storage() {
    let mut isolate = Isolate::default();
    let s = NativeString::new("zero copy");

    let handle = isolate.external_string(&s).unwrap();
    let lent = openworkers_string_cache::ExternalStringResource::from(&s);

    assert_eq!(handle.resource().data_ptr(), lent.data_ptr());
    assert_eq!(isolate.heap().statistics().external_memory, 9);
}

#[test]
fn test_teardown_releases_everything() {
    let mut heap = ManagedHeap::default();
    let cache = StringCache::<ManagedHeap>::new();
    let strings: Vec<NativeString> = ["one", "two", "three"]
        .into_iter()
        .map(NativeString::new)
        .collect();

    let handles: Vec<_> = strings
        .iter()
        .map(|s| cache.resolve(&mut heap, s).unwrap())
        .collect();
    assert_eq!(heap.statistics().weak_handles, 3);

    cache.teardown(&mut heap);

    assert!(cache.is_empty());
    assert_eq!(heap.statistics().weak_handles, 0);
    for s in &strings {
        assert_eq!(s.ref_count(), 1);
    }

    // Objects outlive the cache; collecting them finalizes nothing
    drop(handles);
    assert_eq!(heap.collect_garbage(), 3);
    assert_eq!(cache.stats().finalized, 0);
    assert_eq!(cache.stats().removed, 3);
}

#[test]
fn test_isolate_drop_releases_native_refs() {
    let s = NativeString::new("scoped");

    {
        let mut isolate = Isolate::default();
        let _handle = isolate.external_string(&s).unwrap();
        assert_eq!(s.ref_count(), 2);
    }

    assert_eq!(s.ref_count(), 1);
}

#[test]
fn test_cache_over_heap_trait() {
    fn roundtrip<H: ScriptHeap>(heap: &mut H, cache: &StringCache<H>, s: &NativeString) -> bool {
        let first = cache.resolve(heap, s).unwrap();
        let second = cache.resolve(heap, s).unwrap();
        first == second
    }

    let mut heap = ManagedHeap::default();
    let cache = StringCache::new();
    assert!(roundtrip(&mut heap, &cache, &NativeString::new("generic")));
}
