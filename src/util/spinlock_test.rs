use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_spinlock() {
    let seed: u128 = random();
    println!("test_spinlock seed:{}", seed);
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..16].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[16..].copy_from_slice(&seed.to_le_bytes());
    let mut rng = SmallRng::from_seed(seed_bytes);

    let n_threads: u64 = 8;
    let n_incrs: u64 = rng.gen_range(1_000..10_000);

    let door: Arc<Spinlock<u64>> = Arc::new(Spinlock::new(0));

    let mut handles = vec![];
    for _ in 0..n_threads {
        let door = Arc::clone(&door);
        handles.push(thread::spawn(move || {
            for _ in 0..n_incrs {
                let mut val = door.write();
                *val += 1;
            }
        }));
    }
    for handle in handles.into_iter() {
        handle.join().unwrap();
    }

    assert_eq!(*door.read(), n_threads * n_incrs);

    let stats = door.to_stats().unwrap();
    assert_eq!(stats.latchlock & 0xC0000000, 0);
}

#[test]
fn test_spinlock_read_concurrency() {
    let door: Arc<Spinlock<Vec<u64>>> = Arc::new(Spinlock::new(vec![0; 1024]));

    let mut handles = vec![];
    for _ in 0..4 {
        let door = Arc::clone(&door);
        handles.push(thread::spawn(move || {
            for _ in 0..1000 {
                let val = door.read();
                assert!(val.iter().all(|x| *x == val[0]));
            }
        }));
    }
    {
        let door = Arc::clone(&door);
        handles.push(thread::spawn(move || {
            for i in 1..=100_u64 {
                let mut val = door.write();
                val.iter_mut().for_each(|x| *x = i);
            }
        }));
    }
    for handle in handles.into_iter() {
        handle.join().unwrap();
    }

    assert!(door.read().iter().all(|x| *x == 100));
}
