use super::*;

fn canvas(width: u32, height: u32) -> Canvas {
    Canvas::new(width, height).unwrap()
}

#[test]
fn preallocated_buffers_are_reused() {
    let pool = PixelBufferPool::new(canvas(4, 4), 3, 2).unwrap();
    assert_eq!(pool.free_len(), 2);
    assert_eq!(pool.stats().allocated, 2);

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    let c = pool.acquire().unwrap();
    assert_eq!(a.size(), canvas(4, 4));
    assert_eq!(
        pool.stats(),
        PoolStats {
            allocated: 3,
            reused: 2,
            dropped_on_release: 0
        }
    );

    pool.release(a);
    pool.release(b);
    pool.release(c);
    assert_eq!(pool.free_len(), 3);
}

#[test]
fn release_drops_wrong_size_and_overflow() {
    let pool = PixelBufferPool::new(canvas(2, 2), 1, 0).unwrap();
    pool.release(PixelBuffer::allocate(canvas(3, 3)).unwrap());
    assert_eq!(pool.free_len(), 0);

    pool.release(PixelBuffer::allocate(canvas(2, 2)).unwrap());
    pool.release(PixelBuffer::allocate(canvas(2, 2)).unwrap());
    assert_eq!(pool.free_len(), 1);
    assert_eq!(pool.stats().dropped_on_release, 2);
}

#[test]
fn clones_share_the_free_list() {
    let pool = PixelBufferPool::new(canvas(2, 2), 4, 0).unwrap();
    let other = pool.clone();
    let handle = std::thread::spawn(move || {
        other.release(PixelBuffer::allocate(canvas(2, 2)).unwrap());
    });
    handle.join().unwrap();
    assert_eq!(pool.free_len(), 1);

    pool.drain();
    assert_eq!(pool.free_len(), 0);
}

#[test]
fn zero_sized_pool_fails_on_prealloc() {
    let zero = Canvas {
        width: 0,
        height: 2,
    };
    assert!(PixelBufferPool::new(zero, 2, 1).is_err());
}
