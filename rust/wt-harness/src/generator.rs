//! Random instance generation, one shape per algorithm family.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::family::{AlgorithmFamily, Instance};
use crate::geometry::{dedup_points, Point};

/// Side length of the square hull points are drawn from.
pub const HULL_COORDINATE_RANGE: f64 = 1000.0;

/// Uniform random permutation of `0..n`.
pub fn random_permutation(n: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    perm
}

/// Successor function for the cycle that visits `perm` in order.
///
/// `next[perm[i]] = perm[(i + 1) % n]`.
pub fn circular_list_from_permutation(perm: &[usize]) -> Vec<usize> {
    let n = perm.len();
    let mut next = vec![0; n];
    for i in 0..n {
        next[perm[i]] = perm[(i + 1) % n];
    }
    next
}

/// Whether `next` is one cycle that visits every index exactly once.
pub fn is_single_cycle(next: &[usize]) -> bool {
    let n = next.len();
    let mut seen = vec![false; n];
    let mut cur = 0usize;
    for _ in 0..n {
        if cur >= n || seen[cur] {
            return false;
        }
        seen[cur] = true;
        cur = next[cur];
    }
    cur == 0
}

/// Random single-cycle successor list over `0..n`.
pub fn circular_list(n: usize, rng: &mut impl Rng) -> Vec<usize> {
    circular_list_from_permutation(&random_permutation(n, rng))
}

/// `n` pairwise distinct positive values placed in random order.
///
/// Values grow by a random increment in `1..=10` along a random permutation.
pub fn unique_values(n: usize, rng: &mut impl Rng) -> Vec<i64> {
    let perm = random_permutation(n, rng);
    let mut values = vec![0i64; n];
    let mut val = 0i64;
    for &slot in &perm {
        val += rng.gen_range(1..=10);
        values[slot] = val;
    }
    values
}

/// Two sorted disjoint lists of size `n`, sampled without replacement from
/// `0..20n`.
pub fn disjoint_sorted_pair(n: usize, rng: &mut impl Rng) -> (Vec<i64>, Vec<i64>) {
    let drawn = rand::seq::index::sample(rng, 20 * n, 2 * n).into_vec();
    let mut a: Vec<i64> = drawn[..n].iter().map(|&v| v as i64).collect();
    let mut b: Vec<i64> = drawn[n..].iter().map(|&v| v as i64).collect();
    a.sort_unstable();
    b.sort_unstable();
    (a, b)
}

/// Strictly increasing list (steps of 2 or 3) and a key in `2..2n+2`.
pub fn search_values(n: usize, rng: &mut impl Rng) -> (Vec<i64>, i64) {
    let mut values = Vec::with_capacity(n);
    let mut x = 0i64;
    for _ in 0..n {
        x += rng.gen_range(0..2) + 2;
        values.push(x);
    }
    let key = rng.gen_range(0..(2 * n) as i64) + 2;
    (values, key)
}

/// `n` uniform points in the coordinate square, exact duplicates removed.
pub fn random_points(n: usize, rng: &mut impl Rng) -> Vec<Point> {
    let raw: Vec<Point> = (0..n)
        .map(|_| {
            Point::new(
                rng.gen::<f64>() * HULL_COORDINATE_RANGE,
                rng.gen::<f64>() * HULL_COORDINATE_RANGE,
            )
        })
        .collect();
    dedup_points(&raw)
}

/// Generate an instance for `family` at sweep parameter `parameter`.
///
/// For p-ary search the parameter is the fan-out and `search_size` fixes `n`;
/// for every other family the parameter is `n`.
pub fn generate(
    family: AlgorithmFamily,
    parameter: usize,
    search_size: usize,
    rng: &mut impl Rng,
) -> Instance {
    match family {
        AlgorithmFamily::CircularList | AlgorithmFamily::Coloring => Instance::CircularList {
            next: circular_list(parameter, rng),
        },
        AlgorithmFamily::Maximum => Instance::Values {
            values: unique_values(parameter, rng),
        },
        AlgorithmFamily::Merge => {
            let (a, b) = disjoint_sorted_pair(parameter, rng);
            Instance::Merge { a, b }
        }
        AlgorithmFamily::PArySearch => {
            let (values, key) = search_values(search_size, rng);
            Instance::Search {
                values,
                key,
                fan_out: parameter as u32,
            }
        }
        AlgorithmFamily::UpperHull => Instance::Points {
            points: random_points(parameter, rng),
        },
    }
}
