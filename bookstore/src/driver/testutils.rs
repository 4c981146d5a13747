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

//! Test utilities for the business layer.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use bookstore_core::clocks::testutils::SettableClock;
use bookstore_core::db::{Db, Executor};
use std::sync::Arc;
use time::macros::datetime;

/// State of a running test.
pub(crate) struct TestContext {
    /// Database backing the driver, for direct access to its contents.
    db: Arc<dyn Db + Send + Sync>,

    /// Clock backing the driver, which starts at some point in 2024.
    clock: Arc<SettableClock>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Creates a driver backed by an empty in-memory database.
    pub(crate) async fn setup() -> Self {
        let db = Arc::new(bookstore_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(datetime!(2024-06-15 12:00:00 UTC)));
        let driver = Driver::new(db.clone(), clock.clone());
        Self { db, clock, driver }
    }

    /// Obtains a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns a copy of the driver under test.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Moves the clock to the middle of `year`.
    pub(crate) fn set_year(&self, year: i32) {
        let now = datetime!(2024-06-15 12:00:00 UTC);
        self.clock.set(now.replace_year(year).unwrap());
    }

    /// Creates an author directly in the database.
    pub(crate) async fn create_author(&self, first_name: &str, last_name: &str) -> Author {
        db::create_author(&mut self.ex().await, first_name, last_name).await.unwrap()
    }

    /// Creates an illustrator directly in the database.
    pub(crate) async fn create_illustrator(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Illustrator {
        db::create_illustrator(&mut self.ex().await, first_name, last_name).await.unwrap()
    }

    /// Lists all books in the database by identity.
    pub(crate) async fn list_books(&self) -> Vec<BookSummary> {
        db::list_books(&mut self.ex().await, None, SortKey::Id).await.unwrap()
    }

    /// Inserts a book whose stored genres cannot be decoded.
    pub(crate) async fn corrupt_genres(&self) {
        let illustrator = self.create_illustrator("Broken", "Data").await;
        match self.ex().await {
            Executor::Sqlite(mut ex) => {
                sqlx::query(
                    "INSERT INTO books (title, publication_year, illustrator_id, genres)
                    VALUES ('Corrupt', 1900, ?, 'Drama,Bogus')",
                )
                .bind(illustrator.id().as_i32())
                .execute(ex.conn())
                .await
                .unwrap();
            }

            #[allow(unused)]
            _ => unreachable!(),
        }
    }
}
