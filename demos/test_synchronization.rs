//! Stress test for [`afl_locks::once::OnceCell`].
//!
//! We create a `Vec` of `N_ROUNDS` cells. All threads walk the `Vec` and
//! race to be the first to initialize each cell with their own thread
//! index. Every thread accumulates the values it observes; all threads
//! must end up with the same accumulator, which is only possible if every
//! cell was initialized exactly once and every reader saw the same
//! winning value.
//!
//! Run in release mode for a meaningful race window:
//! `cargo run --release --example test_synchronization`.

use afl_locks::once::OnceCell;

const N_THREADS: usize = 32;
const N_ROUNDS: usize = 1_000_000;

static CELLS: OnceCell<Vec<OnceCell<usize>>> = OnceCell::new();
static RESULT: OnceCell<usize> = OnceCell::new();

fn main() {
    println!("Started test");
    let start = std::time::Instant::now();
    CELLS.get_or_init(|| (0..N_ROUNDS).map(|_| OnceCell::new()).collect());
    let threads = (0..N_THREADS)
        .map(|i| std::thread::spawn(move || thread_main(i)))
        .collect::<Vec<_>>();
    for thread in threads {
        thread.join().unwrap();
    }
    println!("{:?}", start.elapsed());
    println!("No races detected");
}

fn thread_main(i: usize) {
    let cells = CELLS.get().unwrap();
    let mut accum = 0;
    for cell in cells.iter() {
        let &value = cell.get_or_init(|| i);
        accum += value;
    }
    assert_eq!(*RESULT.get_or_init(|| accum), accum);
}
