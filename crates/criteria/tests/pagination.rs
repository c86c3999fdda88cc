//! Paged listing and page-by-page traversal.

mod common;

use common::{engine, numbered, User};
use criteria::prelude::*;
use pretty_assertions::assert_eq;

fn ids(users: &[User]) -> Vec<i64> {
    users.iter().map(|u| u.id).collect()
}

#[test]
fn test_pages_sorted_by() {
    let engine = engine();
    let provider = numbered(&engine, 9);
    let users = engine.repository::<User, _>(&provider);

    let first = users
        .pages_sorted_by(User::ID, PageSpec::new(0, 2), |_| {})
        .unwrap();
    assert_eq!(ids(&first.rows), vec![0, 1]);
    assert_eq!(first.total_elements, 9);
    assert_eq!(first.total_pages, 5);
    assert!(first.has_next());

    let second = users
        .pages_sorted_by(User::ID, PageSpec::new(1, 2), |_| {})
        .unwrap();
    assert_eq!(ids(&second.rows), vec![2, 3]);

    let last = users
        .pages_sorted_by(User::ID, PageSpec::new(4, 2), |_| {})
        .unwrap();
    assert_eq!(ids(&last.rows), vec![8]);
    assert!(!last.has_next());

    let beyond = users
        .pages_sorted_by(User::ID, PageSpec::new(7, 2), |_| {})
        .unwrap();
    assert!(beyond.rows.is_empty());
    assert_eq!(beyond.total_elements, 9);
}

#[test]
fn test_pages_with_sort_in_request() {
    let engine = engine();
    let provider = numbered(&engine, 9);
    let users = engine.repository::<User, _>(&provider);

    let page = users
        .pages_by(
            PageSpec::new(0, 3).with_sort(vec![User::LOGIN.desc()]),
            |q| q.get(User::ID).ge(2),
        )
        .unwrap();
    assert_eq!(ids(&page.rows), vec![8, 7, 6]);
    assert_eq!(page.total_elements, 7);
    assert_eq!(page.total_pages, 3);
}

#[test]
fn test_pages_as_projection() {
    let engine = engine();
    let provider = numbered(&engine, 5);
    let users = engine.repository::<User, _>(&provider);

    let page = users
        .pages_as::<String>(PageSpec::new(1, 2), |q| {
            q.order_by(q.get(User::EMAIL), OrderDirection::Asc);
            q.select(q.get(User::EMAIL));
        })
        .unwrap();
    assert_eq!(page.into_rows(), vec!["user2", "user3"]);
}

#[test]
fn test_pages_by_default() {
    let engine = engine()
        .with_config(EngineConfig::new().with_default_page_size(4))
        .unwrap();
    let provider = numbered(&engine, 9);
    let users = engine.repository::<User, _>(&provider);

    let page = users.pages_by_default(|_| {}).unwrap();
    assert_eq!(page.page.index, 0);
    assert_eq!(page.rows.len(), 4);
    assert_eq!(page.total_pages, 3);
}

#[test]
fn test_aggregate_page() {
    let engine = engine();
    let provider = numbered(&engine, 3);
    let users = engine.repository::<User, _>(&provider);

    let page = users
        .pages_as::<i64>(PageSpec::new(0, 2), |q| q.select(q.count()))
        .unwrap();
    assert_eq!(page.rows, vec![3]);
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next());
}

#[test]
fn test_invalid_page_requests() {
    let engine = engine()
        .with_config(
            EngineConfig::new()
                .with_default_page_size(5)
                .with_max_page_size(10),
        )
        .unwrap();
    let provider = numbered(&engine, 3);
    let users = engine.repository::<User, _>(&provider);

    assert!(matches!(
        users.pages_by(PageSpec::new(0, 0), |_| {}),
        Err(Error::InvalidPage { .. })
    ));
    assert!(matches!(
        users.pages_by(PageSpec::new(0, 11), |_| {}),
        Err(Error::InvalidPage { .. })
    ));
}

#[test]
fn test_for_each_until_visits_every_page() {
    let engine = engine();
    let provider = numbered(&engine, 9);
    let users = engine.repository::<User, _>(&provider);

    let mut visited = Vec::new();
    users
        .pages_sorted_by(User::ID, PageSpec::new(0, 2), |_| {})
        .unwrap()
        .for_each_until(|rows| {
            visited.push(ids(rows));
            false
        })
        .unwrap();

    assert_eq!(
        visited,
        vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7], vec![8]]
    );
}

#[test]
fn test_for_each_until_stops_on_signal() {
    let engine = engine();
    let provider = numbered(&engine, 9);
    let users = engine.repository::<User, _>(&provider);

    let mut visits = 0;
    users
        .pages_sorted_by(User::ID, PageSpec::new(1, 2), |_| {})
        .unwrap()
        .for_each_until(|rows| {
            visits += 1;
            rows.iter().any(|u| u.id == 5)
        })
        .unwrap();

    assert_eq!(visits, 2);
}

#[test]
fn test_into_pages_ends_on_empty_page() {
    let engine = engine();
    let provider = numbered(&engine, 8);
    let users = engine.repository::<User, _>(&provider);

    let pages: Vec<Vec<i64>> = users
        .pages_sorted_by(User::ID, PageSpec::new(0, 4), |_| {})
        .unwrap()
        .into_pages()
        .map(|page| page.map(|rows| ids(&rows)))
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
}

#[test]
fn test_traversal_sees_later_mutations() {
    let engine = engine();
    let provider = numbered(&engine, 6);
    let users = engine.repository::<User, _>(&provider);

    let mut pages = users
        .pages_sorted_by(User::ID, PageSpec::new(0, 2), |_| {})
        .unwrap()
        .into_pages();

    let first = pages.next().unwrap().unwrap();
    assert_eq!(ids(&first), vec![0, 1]);

    // Rows deleted between pages shift the window.
    users.delete_by(|q| q.get(User::ID).le(1)).unwrap();
    let second = pages.next().unwrap().unwrap();
    assert_eq!(ids(&second), vec![4, 5]);
    assert!(pages.next().is_none());
}
