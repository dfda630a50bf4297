use proptest::prelude::*;
use rusqlite::Connection;
use transferable_core::{DanglingChecker, Entity, TransferEngine};

mod support;
use support::*;

/// Books and genre covers per genre, for genres 1..=3.
#[derive(Debug, Clone)]
struct Catalogue {
    books: [usize; 3],
    covers: [usize; 3],
}

fn arb_catalogue() -> impl Strategy<Value = Catalogue> {
    (
        prop::array::uniform3(0usize..6),
        prop::array::uniform3(0usize..4),
    )
        .prop_map(|(books, covers)| Catalogue { books, covers })
}

fn seed(catalogue: &Catalogue) -> Connection {
    let conn = catalogue_db();
    for (index, (&books, &covers)) in catalogue.books.iter().zip(&catalogue.covers).enumerate() {
        let id = i64::try_from(index).expect("small index") + 1;
        add_genre(&conn, id, "genre");
        for n in 0..books {
            add_book(&conn, &format!("book {id}.{n}"), Some(id), None);
        }
        for _ in 0..covers {
            add_cover(&conn, "genre", id);
        }
    }
    conn
}

fn genre_pair() -> impl Strategy<Value = (i64, i64)> {
    (1i64..=3, 1i64..=3)
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(128))]

    #[test]
    fn transfer_conserves_dependents(catalogue in arb_catalogue(), (from, to) in genre_pair()) {
        prop_assume!(from != to);
        let conn = seed(&catalogue);
        let registry = catalogue_registry(&["books", "covers"]);
        let checker = DanglingChecker::new(&registry);
        let (source, target) = (Entity::new("genre", from), Entity::new("genre", to));

        let a = checker.count_dependents(&conn, &source).expect("count source");
        let b = checker.count_dependents(&conn, &target).expect("count target");
        let moved = TransferEngine::new(&registry)
            .transfer(&conn, &source, &target, false)
            .expect("transfer");

        prop_assert_eq!(moved, a);
        prop_assert_eq!(checker.count_dependents(&conn, &source).expect("count source"), 0);
        prop_assert_eq!(checker.count_dependents(&conn, &target).expect("count target"), a + b);
    }

    #[test]
    fn dry_run_matches_real_transfer_and_changes_nothing(
        catalogue in arb_catalogue(),
        (from, to) in genre_pair(),
    ) {
        let conn = seed(&catalogue);
        let registry = catalogue_registry(&["books", "covers"]);
        let engine = TransferEngine::new(&registry);
        let (source, target) = (Entity::new("genre", from), Entity::new("genre", to));
        let before = snapshot(&conn);

        let dry = engine.transfer(&conn, &source, &target, true).expect("dry run");
        prop_assert_eq!(snapshot(&conn), before);

        let real = engine.transfer(&conn, &source, &target, false).expect("transfer");
        prop_assert_eq!(dry, real);
    }

    #[test]
    fn self_transfer_is_zero(catalogue in arb_catalogue(), id in 1i64..=3) {
        let conn = seed(&catalogue);
        let registry = catalogue_registry(&["books", "covers"]);
        let entity = Entity::new("genre", id);
        let before = snapshot(&conn);

        let moved = TransferEngine::new(&registry)
            .transfer(&conn, &entity, &entity, false)
            .expect("self transfer");
        prop_assert_eq!(moved, 0);
        prop_assert_eq!(snapshot(&conn), before);
    }

    #[test]
    fn through_relations_conserve_far_rows(
        chapters in prop::collection::vec(0usize..4, 1..5),
        (from, to) in genre_pair(),
    ) {
        prop_assume!(from != to);
        let conn = seed(&Catalogue { books: [0; 3], covers: [0; 3] });
        for (n, &count) in chapters.iter().enumerate() {
            let genre = if n % 2 == 0 { from } else { to };
            let book = add_book(&conn, "book", Some(genre), None);
            add_chapters(&conn, book, count);
        }
        let registry = catalogue_registry(&["chapters"]);
        let checker = DanglingChecker::new(&registry);
        let (source, target) = (Entity::new("genre", from), Entity::new("genre", to));

        let a = checker.count_dependents(&conn, &source).expect("count source");
        let b = checker.count_dependents(&conn, &target).expect("count target");
        TransferEngine::new(&registry)
            .transfer(&conn, &source, &target, false)
            .expect("transfer");

        prop_assert_eq!(checker.count_dependents(&conn, &source).expect("count source"), 0);
        prop_assert_eq!(checker.count_dependents(&conn, &target).expect("count target"), a + b);
    }
}
