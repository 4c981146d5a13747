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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::Driver;
use crate::model::*;
use crate::rest::app;
use axum::Router;
use bookstore_core::clocks::testutils::SettableClock;
use bookstore_core::db::{Db, Executor};
use std::sync::Arc;
use time::macros::datetime;

pub(crate) struct TestContext {
    db: Arc<dyn Db + Send + Sync>,
    app: Router,
}

impl TestContext {
    pub(crate) async fn setup() -> Self {
        let db = Arc::new(bookstore_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(datetime!(2024-03-01 08:00:00 UTC)));
        let driver = Driver::new(db.clone(), clock);
        let app = app(driver);
        Self { db, app }
    }

    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    pub(crate) async fn create_author(&self, first_name: &str, last_name: &str) -> AuthorId {
        *db::create_author(&mut self.ex().await, first_name, last_name).await.unwrap().id()
    }

    pub(crate) async fn create_illustrator(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> IllustratorId {
        *db::create_illustrator(&mut self.ex().await, first_name, last_name).await.unwrap().id()
    }

    pub(crate) async fn list_books(&self) -> Vec<BookSummary> {
        db::list_books(&mut self.ex().await, None, SortKey::Id).await.unwrap()
    }

    /// Runs an arbitrary `statement` against the database to break it in the way a test needs.
    pub(crate) async fn break_db(&self, statement: &str) {
        match self.ex().await {
            Executor::Sqlite(mut ex) => {
                sqlx::raw_sql(statement).execute(ex.conn()).await.unwrap();
            }

            #[allow(unused)]
            _ => unreachable!(),
        }
    }
}
