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

//! Entry point to the bookstore catalog service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use bookstore::db::{init_schema, seed};
use bookstore::serve;
use bookstore_core::db::Db;
use bookstore_core::db::postgres::{PostgresDb, PostgresOptions};
use bookstore_core::env::get_optional_var;
use std::error::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let port = get_optional_var::<u16>("BOOKSTORE", "PORT")?.unwrap_or(3000);
    let addr = (Ipv4Addr::UNSPECIFIED, port);

    let db_opts = PostgresOptions::from_env("PGSQL_PROD")?;
    let db = Arc::new(PostgresDb::connect(db_opts)?);
    {
        let mut ex = db.ex().await?;
        init_schema(&mut ex).await?;
        seed(&mut ex).await?;
    }

    let result = serve(addr, db.clone()).await;
    db.close().await;
    result
}
