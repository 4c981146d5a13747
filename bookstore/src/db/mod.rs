// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database abstraction in terms of the operations needed by the catalog.

use crate::model::*;
#[cfg(feature = "postgres")]
use bookstore_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use bookstore_core::db::sqlite;
use bookstore_core::db::{DbError, DbResult, Executor};
use futures::TryStreamExt;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use std::collections::BTreeMap;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Populates the database with the initial set of authors and illustrators.  This is idempotent.
pub async fn seed(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres_seed.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite_seed.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Returns the `ORDER BY` clause to sort listings by `sort`.
fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::Id => "b.id",
        SortKey::Title => "b.title, b.id",
        SortKey::Year => "b.publication_year, b.id",
    }
}

/// Returns a list of `n` positional parameters for use in an `IN` clause.
#[cfg(any(feature = "sqlite", test))]
fn sqlite_placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Raw contents of a book as needed to build its `BookSummary`.
struct BookRow {
    /// Identity of the book.
    id: BookId,

    /// Title of the book.
    title: String,

    /// Publication year of the book.
    year: i32,

    /// ISBN of the book, if any.
    isbn: Option<String>,

    /// Genres of the book in their persisted form.
    genres: String,

    /// Illustrator that owns the book.
    illustrator: Illustrator,
}

impl BookRow {
    /// Builds the summary of this book given the list of its `authors`.
    fn into_summary(self, authors: &[Author]) -> DbResult<BookSummary> {
        let genres = decode_genres(&self.genres)?;
        Ok(BookSummary::new(
            self.id,
            self.title,
            self.year,
            self.isbn,
            self.illustrator.full_name(),
            authors.iter().map(Author::full_name).collect(),
            genres,
        ))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Author {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(postgres::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(postgres::map_sqlx_error)?;
        Ok(Author::new(AuthorId::new(id), first_name, last_name))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for BookRow {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let title: String = row.try_get("title").map_err(postgres::map_sqlx_error)?;
        let year: i32 = row.try_get("publication_year").map_err(postgres::map_sqlx_error)?;
        let isbn: Option<String> = row.try_get("isbn").map_err(postgres::map_sqlx_error)?;
        let genres: String = row.try_get("genres").map_err(postgres::map_sqlx_error)?;
        let illustrator_id: i32 =
            row.try_get("illustrator_id").map_err(postgres::map_sqlx_error)?;
        let illustrator_first_name: String =
            row.try_get("illustrator_first_name").map_err(postgres::map_sqlx_error)?;
        let illustrator_last_name: String =
            row.try_get("illustrator_last_name").map_err(postgres::map_sqlx_error)?;

        let illustrator = Illustrator::new(
            IllustratorId::new(illustrator_id),
            illustrator_first_name,
            illustrator_last_name,
        );
        Ok(BookRow { id: BookId::new(id), title, year, isbn, genres, illustrator })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Author {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(sqlite::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(sqlite::map_sqlx_error)?;
        Ok(Author::new(AuthorId::new(id), first_name, last_name))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for BookRow {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i32 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let title: String = row.try_get("title").map_err(sqlite::map_sqlx_error)?;
        let year: i32 = row.try_get("publication_year").map_err(sqlite::map_sqlx_error)?;
        let isbn: Option<String> = row.try_get("isbn").map_err(sqlite::map_sqlx_error)?;
        let genres: String = row.try_get("genres").map_err(sqlite::map_sqlx_error)?;
        let illustrator_id: i32 = row.try_get("illustrator_id").map_err(sqlite::map_sqlx_error)?;
        let illustrator_first_name: String =
            row.try_get("illustrator_first_name").map_err(sqlite::map_sqlx_error)?;
        let illustrator_last_name: String =
            row.try_get("illustrator_last_name").map_err(sqlite::map_sqlx_error)?;

        let illustrator = Illustrator::new(
            IllustratorId::new(illustrator_id),
            illustrator_first_name,
            illustrator_last_name,
        );
        Ok(BookRow { id: BookId::new(id), title, year, isbn, genres, illustrator })
    }
}

/// Gets the authors whose identities are in `ids`, sorted by identity.  Identities that do not
/// exist are silently skipped, so callers must compare the result against their input.
pub(crate) async fn get_authors(ex: &mut Executor, ids: &[AuthorId]) -> DbResult<Vec<Author>> {
    let mut authors = vec![];
    if ids.is_empty() {
        return Ok(authors);
    }

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "SELECT id, first_name, last_name FROM authors WHERE id = ANY($1) ORDER BY id";
            let raw_ids = ids.iter().map(|id| id.as_i32()).collect::<Vec<i32>>();
            let mut rows = sqlx::query(query_str).bind(raw_ids).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                authors.push(Author::try_from(row)?);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "SELECT id, first_name, last_name FROM authors WHERE id IN ({}) ORDER BY id",
                sqlite_placeholders(ids.len())
            );
            let mut query = sqlx::query::<sqlx::Sqlite>(&query_str);
            for id in ids {
                query = query.bind(id.as_i32());
            }
            let mut rows = query.fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                authors.push(Author::try_from(row)?);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }

    Ok(authors)
}

/// Checks if the illustrator identified by `id` exists.
pub(crate) async fn illustrator_exists(ex: &mut Executor, id: IllustratorId) -> DbResult<bool> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM illustrators WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM illustrators WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i32())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match count {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DbError::DataIntegrityError(format!("Illustrator {} is not unique", id.as_i32()))),
    }
}

/// Gets all books with exactly the given `title` and `year` along with the identities of their
/// authors, sorted by identity.
pub(crate) async fn get_books_by_title_year(
    ex: &mut Executor,
    title: &str,
    year: i32,
) -> DbResult<BTreeMap<BookId, Vec<AuthorId>>> {
    let mut books: BTreeMap<BookId, Vec<AuthorId>> = BTreeMap::new();

    let mut add_row = |book_id: i32, author_id: Option<i32>| {
        let authors = books.entry(BookId::new(book_id)).or_default();
        if let Some(author_id) = author_id {
            authors.push(AuthorId::new(author_id));
        }
    };

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT b.id AS book_id, ba.author_id
                FROM books b LEFT JOIN book_authors ba ON ba.book_id = b.id
                WHERE b.title = $1 AND b.publication_year = $2
                ORDER BY b.id, ba.author_id";
            let mut rows = sqlx::query(query_str).bind(title).bind(year).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                let book_id: i32 = row.try_get("book_id").map_err(postgres::map_sqlx_error)?;
                let author_id: Option<i32> =
                    row.try_get("author_id").map_err(postgres::map_sqlx_error)?;
                add_row(book_id, author_id);
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT b.id AS book_id, ba.author_id
                FROM books b LEFT JOIN book_authors ba ON ba.book_id = b.id
                WHERE b.title = ? AND b.publication_year = ?
                ORDER BY b.id, ba.author_id";
            let mut rows = sqlx::query(query_str).bind(title).bind(year).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                let book_id: i32 = row.try_get("book_id").map_err(sqlite::map_sqlx_error)?;
                let author_id: Option<i32> =
                    row.try_get("author_id").map_err(sqlite::map_sqlx_error)?;
                add_row(book_id, author_id);
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }

    Ok(books)
}

/// Inserts a new `book` and links it to its authors.  Returns the identity of the new book.
///
/// This issues multiple statements, so callers should run it within a transaction.
pub(crate) async fn insert_book(ex: &mut Executor, book: &NewBook) -> DbResult<BookId> {
    let genres = encode_genres(book.genres());

    let id: i32 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO books (title, publication_year, isbn, illustrator_id, genres)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(book.title())
                .bind(book.publication_year())
                .bind(book.isbn().as_deref())
                .bind(book.illustrator_id().as_i32())
                .bind(&genres)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let id: i32 = row.try_get("id").map_err(postgres::map_sqlx_error)?;

            let query_str = "INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)";
            for author_id in book.author_ids() {
                sqlx::query(query_str)
                    .bind(id)
                    .bind(author_id.as_i32())
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?;
            }

            id
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO books (title, publication_year, isbn, illustrator_id, genres)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(book.title())
                .bind(book.publication_year())
                .bind(book.isbn().as_deref())
                .bind(book.illustrator_id().as_i32())
                .bind(&genres)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let id: i32 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;

            let query_str = "INSERT INTO book_authors (book_id, author_id) VALUES (?, ?)";
            for author_id in book.author_ids() {
                sqlx::query(query_str)
                    .bind(id)
                    .bind(author_id.as_i32())
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?;
            }

            id
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(BookId::new(id))
}

/// Groups `authors` rows, tagged with the book they belong to, by book.
fn group_by_book(links: Vec<(BookId, Author)>) -> BTreeMap<BookId, Vec<Author>> {
    let mut grouped: BTreeMap<BookId, Vec<Author>> = BTreeMap::new();
    for (book_id, author) in links {
        grouped.entry(book_id).or_default().push(author);
    }
    grouped
}

/// Lists all books, optionally restricted to those with an author whose first or last name
/// contains `filter`, sorted by `sort`.
pub(crate) async fn list_books(
    ex: &mut Executor,
    filter: Option<&AuthorFilter>,
    sort: SortKey,
) -> DbResult<Vec<BookSummary>> {
    let filter = filter.map(AuthorFilter::as_str);

    let mut books = vec![];
    let mut links = vec![];
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT
                    b.id, b.title, b.publication_year, b.isbn, b.genres, b.illustrator_id,
                    i.first_name AS illustrator_first_name, i.last_name AS illustrator_last_name
                FROM books b JOIN illustrators i ON i.id = b.illustrator_id
                WHERE $1::TEXT IS NULL OR EXISTS (
                    SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                    WHERE ba.book_id = b.id
                        AND (strpos(a.first_name, $1) > 0 OR strpos(a.last_name, $1) > 0))
                ORDER BY {}",
                order_by(sort)
            );
            let mut rows = sqlx::query(&query_str).bind(filter).fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                books.push(BookRow::try_from(row)?);
            }
            drop(rows);

            if !books.is_empty() {
                let query_str = "
                    SELECT ba.book_id, a.id, a.first_name, a.last_name
                    FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                    WHERE ba.book_id = ANY($1)
                    ORDER BY ba.book_id, a.id";
                let book_ids = books.iter().map(|b| b.id.as_i32()).collect::<Vec<i32>>();
                let mut rows = sqlx::query(query_str).bind(book_ids).fetch(ex.conn());
                while let Some(row) = rows.try_next().await.map_err(postgres::map_sqlx_error)? {
                    let book_id: i32 = row.try_get("book_id").map_err(postgres::map_sqlx_error)?;
                    links.push((BookId::new(book_id), Author::try_from(row)?));
                }
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT
                    b.id, b.title, b.publication_year, b.isbn, b.genres, b.illustrator_id,
                    i.first_name AS illustrator_first_name, i.last_name AS illustrator_last_name
                FROM books b JOIN illustrators i ON i.id = b.illustrator_id
                WHERE ? IS NULL OR EXISTS (
                    SELECT 1 FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                    WHERE ba.book_id = b.id
                        AND (instr(a.first_name, ?) > 0 OR instr(a.last_name, ?) > 0))
                ORDER BY {}",
                order_by(sort)
            );
            let mut rows = sqlx::query(&query_str)
                .bind(filter)
                .bind(filter)
                .bind(filter)
                .fetch(ex.conn());
            while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                books.push(BookRow::try_from(row)?);
            }
            drop(rows);

            if !books.is_empty() {
                let query_str = format!(
                    "
                    SELECT ba.book_id, a.id, a.first_name, a.last_name
                    FROM book_authors ba JOIN authors a ON a.id = ba.author_id
                    WHERE ba.book_id IN ({})
                    ORDER BY ba.book_id, a.id",
                    sqlite_placeholders(books.len())
                );
                let mut query = sqlx::query::<sqlx::Sqlite>(&query_str);
                for book in &books {
                    query = query.bind(book.id.as_i32());
                }
                let mut rows = query.fetch(ex.conn());
                while let Some(row) = rows.try_next().await.map_err(sqlite::map_sqlx_error)? {
                    let book_id: i32 = row.try_get("book_id").map_err(sqlite::map_sqlx_error)?;
                    links.push((BookId::new(book_id), Author::try_from(row)?));
                }
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }

    let mut authors = group_by_book(links);
    let mut summaries = Vec::with_capacity(books.len());
    for book in books {
        let book_authors = authors.remove(&book.id).unwrap_or_default();
        summaries.push(book.into_summary(&book_authors)?);
    }
    Ok(summaries)
}

/// Creates a new author named `first_name` `last_name`.
#[cfg(test)]
pub(crate) async fn create_author(
    ex: &mut Executor,
    first_name: &str,
    last_name: &str,
) -> DbResult<Author> {
    let id: i32 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO authors (first_name, last_name) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(first_name)
                .bind(last_name)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO authors (first_name, last_name) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(first_name)
                .bind(last_name)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }
    };

    Ok(Author::new(AuthorId::new(id), first_name.to_owned(), last_name.to_owned()))
}

/// Creates a new illustrator named `first_name` `last_name`.
#[cfg(test)]
pub(crate) async fn create_illustrator(
    ex: &mut Executor,
    first_name: &str,
    last_name: &str,
) -> DbResult<Illustrator> {
    let id: i32 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO illustrators (first_name, last_name) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(first_name)
                .bind(last_name)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO illustrators (first_name, last_name) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(first_name)
                .bind(last_name)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }
    };

    Ok(Illustrator::new(IllustratorId::new(id), first_name.to_owned(), last_name.to_owned()))
}
