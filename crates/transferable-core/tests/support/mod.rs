//! Shared fixtures for the library integration tests: a small catalogue of
//! genres, books, chapters and cover images.

#![allow(dead_code)]

use rusqlite::Connection;
use transferable_core::config::Settings;
use transferable_core::db;
use transferable_core::{EntityType, Registry, RelationDescriptor};

pub const SCHEMA: &str = "
    CREATE TABLE genres (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE shelves (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
    CREATE TABLE books (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        genre_id INTEGER,
        shelf_id INTEGER
    );
    CREATE TABLE chapters (id INTEGER PRIMARY KEY, book_id INTEGER NOT NULL);
    CREATE TABLE images (
        id INTEGER PRIMARY KEY,
        imageable_id INTEGER,
        imageable_type TEXT
    );
    CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
    CREATE TABLE genre_tags (genre_id INTEGER NOT NULL, tag_id INTEGER NOT NULL);
";

/// In-memory database with the catalogue schema and default pragmas.
pub fn catalogue_db() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    db::configure(&conn, &Settings::default()).expect("configure pragmas");
    conn.execute_batch(SCHEMA).expect("create schema");
    conn
}

/// Genre (strict) declaring `declared` as transferable; shelf (lenient)
/// declaring its books.
pub fn catalogue_registry(declared: &[&str]) -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            EntityType::new("genre", "genres")
                .strict(true)
                .relation("books", RelationDescriptor::has_many("book", "genre_id"))
                .relation(
                    "chapters",
                    RelationDescriptor::has_many_through("chapter", "book", "genre_id", "book_id"),
                )
                .relation(
                    "covers",
                    RelationDescriptor::morph_many("image", "imageable_id", "imageable_type"),
                )
                .relation(
                    "tags",
                    RelationDescriptor::many_to_many("tag", "genre_tags", "genre_id", "tag_id"),
                )
                .attribute("name")
                .transferable(declared.iter().copied()),
        )
        .expect("register genre");
    registry
        .register(
            EntityType::new("shelf", "shelves")
                .relation("books", RelationDescriptor::has_many("book", "shelf_id"))
                .transferable(["books"]),
        )
        .expect("register shelf");
    registry.register(EntityType::new("book", "books")).expect("register book");
    registry.register(EntityType::new("chapter", "chapters")).expect("register chapter");
    registry.register(EntityType::new("image", "images")).expect("register image");
    registry.register(EntityType::new("tag", "tags")).expect("register tag");
    registry.validate().expect("registry references resolve");
    registry
}

pub fn add_genre(conn: &Connection, id: i64, name: &str) {
    conn.execute("INSERT INTO genres (id, name) VALUES (?1, ?2)", (id, name))
        .expect("insert genre");
}

pub fn add_shelf(conn: &Connection, id: i64, label: &str) {
    conn.execute("INSERT INTO shelves (id, label) VALUES (?1, ?2)", (id, label))
        .expect("insert shelf");
}

pub fn add_book(conn: &Connection, title: &str, genre: Option<i64>, shelf: Option<i64>) -> i64 {
    conn.execute(
        "INSERT INTO books (title, genre_id, shelf_id) VALUES (?1, ?2, ?3)",
        (title, genre, shelf),
    )
    .expect("insert book");
    conn.last_insert_rowid()
}

pub fn add_chapters(conn: &Connection, book: i64, count: usize) {
    for _ in 0..count {
        conn.execute("INSERT INTO chapters (book_id) VALUES (?1)", [book])
            .expect("insert chapter");
    }
}

pub fn add_cover(conn: &Connection, owner_type: &str, owner_id: i64) {
    conn.execute(
        "INSERT INTO images (imageable_id, imageable_type) VALUES (?1, ?2)",
        (owner_id, owner_type),
    )
    .expect("insert image");
}

pub fn tag_genre(conn: &Connection, genre: i64, tag: i64) {
    conn.execute("INSERT OR IGNORE INTO tags (id, label) VALUES (?1, 'tag')", [tag])
        .expect("insert tag");
    conn.execute("INSERT INTO genre_tags (genre_id, tag_id) VALUES (?1, ?2)", [genre, tag])
        .expect("insert pivot");
}

pub fn delete_genre(conn: &Connection, id: i64) -> transferable_core::Result<usize> {
    Ok(conn.execute("DELETE FROM genres WHERE id = ?1", [id])?)
}

pub fn genre_exists(conn: &Connection, id: i64) -> bool {
    conn.query_row("SELECT COUNT(*) FROM genres WHERE id = ?1", [id], |r| r.get::<_, i64>(0))
        .expect("count genres")
        == 1
}

/// Snapshot of every foreign-key column, for before/after comparisons.
pub fn snapshot(conn: &Connection) -> Vec<(String, Option<i64>, Option<String>)> {
    let mut stmt = conn
        .prepare(
            "SELECT 'book:' || id, genre_id, NULL FROM books
             UNION ALL SELECT 'image:' || id, imageable_id, imageable_type FROM images
             UNION ALL SELECT 'pivot:' || rowid, genre_id, NULL FROM genre_tags
             ORDER BY 1",
        )
        .expect("prepare snapshot");
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("query snapshot")
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("read snapshot")
}
