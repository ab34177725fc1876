/// Unit tests for range.rs

use crate::utils::URange32;

#[test]
fn test_len_and_empty() {
    let range = URange32::new(3, 7);
    assert_eq!(range.len(), 4);
    assert!(!range.is_empty());

    let empty = URange32::new(5, 5);
    assert_eq!(empty.len(), 0);
    assert!(empty.is_empty());
}

#[test]
fn test_contains_is_half_open() {
    let range = URange32::new(3, 7);
    assert!(!range.contains(2));
    assert!(range.contains(3));
    assert!(range.contains(6));
    assert!(!range.contains(7));
}

#[test]
fn test_iter_covers_ids_in_order() {
    let range = URange32::new(10, 13);
    let ids: Vec<u32> = range.iter().collect();
    assert_eq!(ids, vec![10, 11, 12]);
}
