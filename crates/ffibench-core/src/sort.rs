//! Partition-exchange sort over `i32` buffers.
//!
//! The sort asks its comparator for every ordering decision and never
//! compares elements itself. Two comparator shapes share one algorithm, so
//! they issue exactly the same sequence of comparisons for the same input:
//! - token comparators receive [`ElementToken`]s naming the elements in place
//!   (the bridged, managed-runtime case);
//! - value comparators receive the two `i32` values.
//!
//! Not stable. Zero comparisons for fewer than two elements.

use crate::token::ElementToken;

/// Sort `buffer` in place, asking `compare` for every ordering decision.
///
/// `compare(a, b)` follows the three-way contract: negative when `a` sorts
/// before `b`, zero when equal, positive otherwise. The first error stops the
/// sort and is returned; the buffer is then left in an unspecified order.
pub fn try_sort_by_token<E, F>(buffer: &mut [i32], compare: F) -> Result<(), E>
where
    F: FnMut(ElementToken, ElementToken) -> Result<i32, E>,
{
    quicksort(buffer, &mut ByToken(compare))
}

/// Infallible form of [`try_sort_by_token`].
pub fn sort_by_token<F>(buffer: &mut [i32], mut compare: F)
where
    F: FnMut(ElementToken, ElementToken) -> i32,
{
    let Ok(()) =
        try_sort_by_token::<std::convert::Infallible, _>(buffer, |a, b| Ok(compare(a, b)));
}

/// Sort `buffer` in place comparing element values.
pub fn sort_by_value<F>(buffer: &mut [i32], compare: F)
where
    F: FnMut(i32, i32) -> i32,
{
    let Ok(()) = quicksort::<std::convert::Infallible, _>(buffer, &mut ByValue(compare));
}

/// Number of comparisons the sort performs on `input`, using ascending
/// numeric order. Leaves `input` untouched.
#[must_use]
pub fn comparison_count(input: &[i32]) -> u64 {
    let mut scratch = input.to_vec();
    let mut count = 0_u64;
    sort_by_value(&mut scratch, |a, b| {
        count += 1;
        a.cmp(&b) as i32
    });
    count
}

/// One ordering decision between `buffer[a]` and `buffer[b]`.
trait Comparison<E> {
    fn compare(&mut self, buffer: &[i32], a: usize, b: usize) -> Result<i32, E>;
}

struct ByToken<F>(F);

impl<E, F> Comparison<E> for ByToken<F>
where
    F: FnMut(ElementToken, ElementToken) -> Result<i32, E>,
{
    #[inline]
    fn compare(&mut self, buffer: &[i32], a: usize, b: usize) -> Result<i32, E> {
        (self.0)(ElementToken::of(&buffer[a]), ElementToken::of(&buffer[b]))
    }
}

struct ByValue<F>(F);

impl<E, F> Comparison<E> for ByValue<F>
where
    F: FnMut(i32, i32) -> i32,
{
    #[inline]
    fn compare(&mut self, buffer: &[i32], a: usize, b: usize) -> Result<i32, E> {
        Ok((self.0)(buffer[a], buffer[b]))
    }
}

fn quicksort<E, C>(mut buffer: &mut [i32], cmp: &mut C) -> Result<(), E>
where
    C: Comparison<E>,
{
    while buffer.len() > 1 {
        let pivot = partition(buffer, cmp)?;
        let (left, right) = std::mem::take(&mut buffer).split_at_mut(pivot);
        // right[0] is the pivot, already in its final position.
        let right = &mut right[1..];

        // Recurse into the smaller side; keeps stack depth logarithmic.
        if left.len() < right.len() {
            quicksort(left, cmp)?;
            buffer = right;
        } else {
            quicksort(right, cmp)?;
            buffer = left;
        }
    }
    Ok(())
}

/// Hoare-style partition around the middle element. Returns the pivot's
/// final index.
///
/// The pivot is parked at index 0 and stays there while both scans compare
/// against it, so every comparison names the pivot by the same position.
/// Both scans stop on elements equal to the pivot, which keeps runs of
/// duplicates split down the middle.
fn partition<E, C>(buffer: &mut [i32], cmp: &mut C) -> Result<usize, E>
where
    C: Comparison<E>,
{
    // Middle pivot keeps already-sorted input (the common benchmark case) at
    // n log n comparisons.
    buffer.swap(0, buffer.len() / 2);

    let mut i = 1;
    let mut j = buffer.len() - 1;
    loop {
        while i <= j && cmp.compare(buffer, i, 0)? < 0 {
            i += 1;
        }
        // buffer[i] >= pivot here unless i > j; never compare it twice.
        while i < j && cmp.compare(buffer, j, 0)? > 0 {
            j -= 1;
        }
        if i >= j {
            break;
        }
        buffer.swap(i, j);
        i += 1;
        j -= 1;
    }
    // [1, i) sorts at or before the pivot, [i, len) at or after it.
    let pivot = i - 1;
    buffer.swap(0, pivot);
    Ok(pivot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(a: i32, b: i32) -> i32 {
        a.cmp(&b) as i32
    }

    #[test]
    fn sorts_example_with_duplicates_and_negatives() {
        let mut data = [5, 3, 3, -1, 0];
        sort_by_value(&mut data, ascending);
        assert_eq!(data, [-1, 0, 3, 3, 5]);
    }

    #[test]
    fn empty_and_single_element_need_no_comparisons() {
        let mut calls = 0;
        let mut empty: [i32; 0] = [];
        sort_by_value(&mut empty, |a, b| {
            calls += 1;
            ascending(a, b)
        });
        let mut single = [42];
        sort_by_value(&mut single, |a, b| {
            calls += 1;
            ascending(a, b)
        });
        assert_eq!(calls, 0);
        assert_eq!(single, [42]);
        assert_eq!(comparison_count(&[]), 0);
        assert_eq!(comparison_count(&[1]), 0);
    }

    #[test]
    fn descending_comparator_reverses() {
        let mut data: Vec<i32> = (0..32).collect();
        sort_by_value(&mut data, |a, b| ascending(b, a));
        let expected: Vec<i32> = (0..32).rev().collect();
        assert_eq!(data, expected);
    }

    #[test]
    fn tokens_name_elements_inside_the_buffer() {
        let mut data = [9, 4, 7, 1, 8, 2];
        let base = data.as_ptr() as u64;
        let end = base + (data.len() * 4) as u64;
        sort_by_token(&mut data, |a, b| {
            for token in [a, b] {
                assert!((base..end).contains(&token.raw()));
                assert_eq!((token.raw() - base) % 4, 0);
            }
            // Order by position; the result only has to stay a permutation.
            a.raw().cmp(&b.raw()) as i32
        });
        let mut sorted = data;
        sorted.sort_unstable();
        assert_eq!(sorted, [1, 2, 4, 7, 8, 9]);
    }

    #[test]
    fn comparator_error_stops_the_sort() {
        let mut data: Vec<i32> = (0..64).rev().collect();
        let mut calls = 0;
        let result: Result<(), &str> = try_sort_by_token(&mut data, |_, _| {
            calls += 1;
            if calls == 5 {
                Err("bridge down")
            } else {
                Ok(-1)
            }
        });
        assert_eq!(result, Err("bridge down"));
        assert_eq!(calls, 5);
    }

    #[test]
    fn duplicate_heavy_input_stays_near_n_log_n() {
        let all_equal = vec![7; 2000];
        let count = comparison_count(&all_equal);
        assert!(count < 2000 * 16, "all-equal input took {count} comparisons");

        let few_values: Vec<i32> = (0..2000).map(|i| i % 3).collect();
        let count = comparison_count(&few_values);
        assert!(count < 2000 * 16, "three-valued input took {count} comparisons");

        let mut data = few_values;
        sort_by_value(&mut data, ascending);
        assert!(data.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn two_elements_take_one_comparison() {
        assert_eq!(comparison_count(&[1, 2]), 1);
        assert_eq!(comparison_count(&[2, 1]), 1);
        assert_eq!(comparison_count(&[4, 4]), 1);
    }

    #[test]
    fn sorted_input_stays_near_n_log_n() {
        let input: Vec<i32> = (0..1024).collect();
        let count = comparison_count(&input);
        assert!(count < 1024 * 20, "sorted input took {count} comparisons");
    }
}
