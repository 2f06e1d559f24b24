//! Integration tests for lifealloc.

use lifealloc::{
    foreign_realloc, install, AllocConfig, LifeVec, Lifetime, LifetimeAlloc, LifetimeError,
    SharedLifetimeAlloc, HEADER_SIZE,
};
use std::ptr::NonNull;

fn small() -> LifetimeAlloc {
    LifetimeAlloc::new(AllocConfig::minimal())
}

fn read_bytes(ptr: NonNull<u8>, len: usize) -> Vec<u8> {
    unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) }.to_vec()
}

#[test]
fn test_usage_only_grows_between_resets() {
    let alloc = small();
    let mut last_used = 0;
    let mut last_capacity = 0;

    for i in 0..200 {
        alloc.allocate_bytes(1 + i % 97, Lifetime::WORLD, Some(1 << (i % 6)));
        let world = alloc.stats().lifetime(Lifetime::WORLD).cloned().unwrap();
        assert!(world.used_bytes > last_used);
        assert!(world.used_bytes <= world.capacity_bytes);
        assert!(world.capacity_bytes >= last_capacity);
        last_used = world.used_bytes;
        last_capacity = world.capacity_bytes;
    }

    alloc.reset_world();
    let world = alloc.stats().lifetime(Lifetime::WORLD).cloned().unwrap();
    assert_eq!(world.used_bytes, 0);
    assert_eq!(world.capacity_bytes, last_capacity);
}

#[test]
fn test_reset_reads_back_zero() {
    let alloc = small();
    for lifetime in [Lifetime::APP, Lifetime::WORLD, Lifetime::FRAME] {
        let ptr = alloc.allocate_bytes(256, lifetime, None);
        unsafe { ptr.as_ptr().write_bytes(0xAB, 256) };

        alloc.free_pages(lifetime);

        let fresh = alloc.allocate_bytes(256, lifetime, None);
        assert_eq!(fresh, ptr);
        assert!(read_bytes(fresh, 256).iter().all(|&b| b == 0));
    }
}

#[test]
fn test_header_round_trip() {
    let alloc = small();
    let life = alloc.lifetime_begin();
    for (n, lifetime) in [(0, Lifetime::APP), (1, Lifetime::WORLD), (5000, Lifetime::FRAME), (77, life)] {
        let ptr = alloc.allocate_bytes(n, lifetime, None);
        let header = unsafe { alloc.header_of(ptr) };
        assert_eq!(header.payload_size(), n);
        assert_eq!(header.lifetime, lifetime);
    }
    alloc.lifetime_end(life);
}

#[test]
fn test_every_power_of_two_alignment() {
    let alloc = small();
    for shift in 0..13 {
        let align = 1usize << shift;
        // An odd-sized allocation first so the cursor is misaligned.
        alloc.allocate_bytes(3, Lifetime::FRAME, None);
        let ptr = alloc.allocate_bytes(10, Lifetime::FRAME, Some(align));
        assert_eq!(ptr.as_ptr() as usize % align, 0, "alignment {}", align);
        assert_eq!(unsafe { alloc.header_of(ptr) }.size, 10);
    }
}

#[test]
fn test_explicit_checkout_discipline() {
    let alloc = small();
    let capacity = alloc.config().max_explicit_lifetimes;

    let mut held = Vec::new();
    for _ in 0..capacity {
        let life = alloc.lifetime_begin();
        assert!(!held.contains(&life));
        held.push(life);
    }
    assert_eq!(
        alloc.try_lifetime_begin(),
        Err(LifetimeError::ExplicitExhausted { capacity })
    );

    // The freed slot is the one handed out next.
    let freed = held.remove(3);
    alloc.lifetime_end(freed);
    assert_eq!(alloc.lifetime_begin(), freed);
    held.push(freed);

    for life in held {
        alloc.lifetime_end(life);
    }
    assert_eq!(alloc.stats().active_explicit_lifetimes, 0);
}

#[test]
#[should_panic(expected = "LA101")]
fn test_exhaustion_is_fatal() {
    let alloc = small();
    for _ in 0..=alloc.config().max_explicit_lifetimes {
        let _ = alloc.lifetime_begin();
    }
}

#[test]
#[should_panic(expected = "LA103")]
fn test_ending_static_lifetime_is_fatal() {
    small().lifetime_end(Lifetime::FRAME);
}

#[test]
#[should_panic(expected = "LA003")]
fn test_allocating_in_ended_lifetime_is_fatal() {
    let alloc = small();
    let life = alloc.lifetime_begin();
    alloc.lifetime_end(life);
    alloc.allocate_bytes(8, life, None);
}

#[test]
fn test_ambient_nesting_restores_top() {
    let alloc = small();
    let pushed = [Lifetime::WORLD, Lifetime::FRAME, Lifetime::APP, Lifetime::FRAME];
    for &life in &pushed {
        alloc.push_api_lifetime(life);
        assert_eq!(alloc.ambient_lifetime(), life);
    }
    for &life in pushed.iter().rev() {
        assert_eq!(alloc.pop_api_lifetime(), life);
    }
    assert_eq!(alloc.ambient_lifetime(), Lifetime::APP);
    assert!(alloc.try_pop_api_lifetime().is_err());
}

#[test]
#[should_panic(expected = "LA203")]
fn test_extra_pop_is_fatal() {
    let alloc = small();
    alloc.push_api_alignment(16);
    alloc.pop_api_alignment();
    alloc.pop_api_alignment();
}

#[test]
#[should_panic(expected = "LA202")]
fn test_ambient_overflow_is_fatal() {
    let alloc = LifetimeAlloc::new(AllocConfig::minimal().with_ambient_stack_depth(2));
    for _ in 0..3 {
        alloc.push_api_lifetime(Lifetime::FRAME);
    }
}

#[test]
#[should_panic(expected = "LA204")]
fn test_scopes_dropped_out_of_order_are_fatal() {
    let alloc = small();
    let world = alloc.lifetime_scope(Lifetime::WORLD);
    let _frame = alloc.lifetime_scope(Lifetime::FRAME);
    drop(world);
}

#[test]
fn test_explicit_scope_ends_with_its_lifetime() {
    let alloc = small();
    let scratch = alloc.explicit_lifetime();
    let life = scratch.lifetime();
    {
        let _ambient = scratch.scope();
        assert_eq!(
            alloc.try_lifetime_end(life),
            Err(LifetimeError::StillAmbient(life))
        );
    }
    drop(scratch);
    assert!(!alloc.is_active(life));
}

#[test]
fn test_realloc_keeps_origin_lifetime() {
    let alloc = small();
    let p = alloc.allocate_bytes(8, Lifetime::WORLD, None);
    unsafe { p.as_ptr().copy_from_nonoverlapping([9u8; 8].as_ptr(), 8) };

    let _frame = alloc.lifetime_scope(Lifetime::FRAME);
    let q = unsafe { alloc.reallocate_for_foreign(Some(p), 64) };

    let header = unsafe { alloc.header_of(q) };
    assert_eq!(header.lifetime, Lifetime::WORLD);
    assert_eq!(header.payload_size(), 64);
    assert_eq!(read_bytes(q, 8), vec![9u8; 8]);
    assert!(read_bytes(q, 64)[8..].iter().all(|&b| b == 0));
}

#[repr(C)]
struct Record {
    id: u64,
    payload: [u8; 32],
}

#[test]
fn test_ended_lifetime_is_wiped() {
    assert_eq!(std::mem::size_of::<Record>(), 40);
    let alloc = small();

    let first = alloc.lifetime_begin();
    let record = alloc.allocate_elem::<Record>(first);
    unsafe {
        record.as_ptr().write(Record {
            id: 0xFEED_FACE,
            payload: [0x5A; 32],
        })
    };
    alloc.lifetime_end(first);

    let second = alloc.lifetime_begin();
    assert_eq!(second, first);
    let again = alloc.allocate_elem::<Record>(second);
    assert_eq!(again, record);
    let bytes = read_bytes(again.cast(), 40);
    assert!(bytes.iter().all(|&b| b == 0));
    alloc.lifetime_end(second);
}

/// Stand-in for a library that only knows about realloc.
fn unaware_push(array: &mut *mut u32, len: &mut usize, value: u32) {
    let grown = unsafe { foreign_realloc((*array).cast(), (*len + 1) * 4) }.cast::<u32>();
    assert!(!grown.is_null());
    unsafe { grown.add(*len).write(value) };
    *array = grown;
    *len += 1;
}

#[test]
fn test_ambient_frame_reaches_foreign_code() {
    let alloc = small();
    let _installed = install(&alloc);

    let mut array = std::ptr::null_mut();
    let mut len = 0;

    alloc.push_api_lifetime(Lifetime::FRAME);
    unaware_push(&mut array, &mut len, 11);
    unaware_push(&mut array, &mut len, 22);
    unaware_push(&mut array, &mut len, 33);
    unaware_push(&mut array, &mut len, 44);
    assert_eq!(alloc.pop_api_lifetime(), Lifetime::FRAME);

    let Some(block) = NonNull::new(array.cast::<u8>()) else {
        panic!("no block");
    };
    let header = unsafe { alloc.header_of(block) };
    assert_eq!(header.lifetime, Lifetime::FRAME);
    assert_eq!(header.payload_size(), 16);
    assert_eq!(unsafe { std::slice::from_raw_parts(array, 4) }, &[11, 22, 33, 44]);

    // Growth after the pop still lands in the frame.
    unaware_push(&mut array, &mut len, 55);
    let block = NonNull::new(array.cast::<u8>()).unwrap();
    assert_eq!(unsafe { alloc.header_of(block) }.lifetime, Lifetime::FRAME);
}

#[test]
fn test_lifevec_first_alloc_sets_lifetime() {
    let alloc = small();
    let mut v = LifeVec::new_in(&alloc);
    v.push(1.5f32, Lifetime::FRAME);
    v.push(2.5, Lifetime::FRAME);
    assert_eq!(v.lifetime(), Some(Lifetime::FRAME));
    assert_eq!(alloc.ambient_lifetime(), Lifetime::APP);
    assert_eq!(&v[..], &[1.5, 2.5]);
}

#[test]
fn test_frame_loop() {
    let alloc = LifetimeAlloc::new(AllocConfig::minimal().with_page_size(1024));
    let level = alloc.allocate_array::<u64>(16, Lifetime::WORLD);

    for frame in 0..10u64 {
        let scratch = alloc.allocate_array::<u64>(64, Lifetime::FRAME);
        unsafe { scratch.as_ptr().write(frame) };
        alloc.end_frame();
    }

    let stats = alloc.stats();
    let frame = stats.lifetime(Lifetime::FRAME).unwrap();
    assert_eq!(frame.used_bytes, 0);
    assert_eq!(frame.page_count, 1);
    assert_eq!(alloc.owner_of(level.as_ptr().cast()), Some(Lifetime::WORLD));
    assert!(stats.lifetime(Lifetime::WORLD).unwrap().used_bytes >= HEADER_SIZE + 128);
}

#[test]
fn test_shared_allocator_from_threads() {
    let alloc = SharedLifetimeAlloc::new(AllocConfig::minimal());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let alloc = alloc.clone();
            std::thread::spawn(move || {
                let life = alloc.lifetime_begin();
                for _ in 0..50 {
                    alloc.allocate_bytes(24, life, Some(8));
                }
                alloc.lifetime_end(life);
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(alloc.stats().active_explicit_lifetimes, 0);
}
