//! Generic comparator-driven sort utilities.
//!
//! The codec uses these to order waveform segment descriptors by their
//! relative file offset after a `wavl` scan, so downstream consumers can
//! rely on file order without re-deriving it from the descriptors. Bubble
//! sort is preferred over quicksort once recursion depth would become a
//! real concern, matching the source's choice to avoid deep recursion on
//! pathologically large inputs.

use rand::Rng;

/// Above this many items, [`quicksort`] falls back to [`bubble_sort`] rather
/// than risk a recursion depth proportional to the input size.
const QUICKSORT_FALLBACK_THRESHOLD: usize = 1 << 16;

/// Sorts `items` in place using repeated adjacent swaps, terminating early
/// once a full pass makes no swaps.
pub fn bubble_sort<T, F>(items: &mut [T], less_than: F)
where
    F: Fn(&T, &T) -> bool,
{
    let n = items.len();
    for i in 0..n {
        let mut swapped = false;
        for j in 0..n.saturating_sub(1).saturating_sub(i) {
            if less_than(&items[j + 1], &items[j]) {
                items.swap(j, j + 1);
                swapped = true;
            }
        }
        if !swapped {
            break;
        }
    }
}

/// Sorts `items` in place using randomized-pivot quicksort, falling back to
/// [`bubble_sort`] for inputs larger than [`QUICKSORT_FALLBACK_THRESHOLD`].
pub fn quicksort<T, F>(items: &mut [T], less_than: &F)
where
    F: Fn(&T, &T) -> bool,
{
    if items.len() > QUICKSORT_FALLBACK_THRESHOLD {
        bubble_sort(items, less_than);
        return;
    }
    let len = items.len();
    quicksort_range(items, 0, len, less_than);
}

fn quicksort_range<T, F>(items: &mut [T], low: usize, high: usize, less_than: &F)
where
    F: Fn(&T, &T) -> bool,
{
    if high.saturating_sub(low) < 2 {
        return;
    }
    let pivot = partition(items, low, high, less_than);
    quicksort_range(items, low, pivot, less_than);
    quicksort_range(items, pivot + 1, high, less_than);
}

/// Picks a random pivot in `[low, high)`, swaps it to `high - 1`, and runs
/// a standard Lomuto partition against it.
fn partition<T, F>(items: &mut [T], low: usize, high: usize, less_than: &F) -> usize
where
    F: Fn(&T, &T) -> bool,
{
    let pivot_idx = rand::thread_rng().gen_range(low..high);
    items.swap(pivot_idx, high - 1);
    let mut store = low;
    for i in low..high - 1 {
        if less_than(&items[i], &items[high - 1]) {
            items.swap(i, store);
            store += 1;
        }
    }
    items.swap(store, high - 1);
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asc(a: &i32, b: &i32) -> bool {
        a < b
    }

    #[test]
    fn bubble_sort_empty_and_singleton() {
        let mut empty: Vec<i32> = vec![];
        bubble_sort(&mut empty, asc);
        assert!(empty.is_empty());

        let mut one = vec![42];
        bubble_sort(&mut one, asc);
        assert_eq!(one, vec![42]);
    }

    #[test]
    fn bubble_sort_orders_ascending() {
        let mut v = vec![5, 3, 8, 1, 9, 1, 0];
        bubble_sort(&mut v, asc);
        assert_eq!(v, vec![0, 1, 1, 3, 5, 8, 9]);
    }

    #[test]
    fn quicksort_orders_ascending() {
        let mut v: Vec<i32> = (0..500).rev().collect();
        quicksort(&mut v, &asc);
        assert_eq!(v, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn quicksort_with_duplicates() {
        let mut v = vec![3, 1, 3, 1, 3, 2, 2, 1];
        quicksort(&mut v, &asc);
        assert_eq!(v, vec![1, 1, 1, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn quicksort_custom_comparator_on_structs() {
        #[derive(Debug, PartialEq, Clone, Copy)]
        struct Item {
            offset: u32,
        }
        let mut items = vec![Item { offset: 30 }, Item { offset: 10 }, Item { offset: 20 }];
        quicksort(&mut items, &|a: &Item, b: &Item| a.offset < b.offset);
        assert_eq!(
            items,
            vec![Item { offset: 10 }, Item { offset: 20 }, Item { offset: 30 }]
        );
    }
}
