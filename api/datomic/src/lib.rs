#![ doc( html_root_url = "https://docs.rs/api_datomic/latest/api_datomic/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for comprehensive API client
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! Datomic client API for Rust
//!
//! An asynchronous client for a remote transactional database service over
//! authenticated HTTP. The crate covers the whole request/response
//! pipeline : payload marshalling into a compact binary envelope, HMAC
//! request signing, submission with per-request timeouts, chunked
//! streaming of large results, anomaly-based error classification, and
//! transparent retry of busy responses with exponential backoff.
//!
//! Failures are values : every operation yields either its result or an
//! [`Anomaly`] tagged with one of a closed set of categories. Nothing in
//! the pipeline throws at callers.
//!
//! Connections are interned process-wide : [`connect`] yields the one
//! live [`Connection`] per validated [`Config`], and the connection's
//! watermark only ever moves forward, no matter in which order concurrent
//! responses land.
//!
//! # Examples
//!
//! ```no_run
//! use api_datomic::{ connect, Config, QInput, TransactInput, Value };
//! use futures_util::StreamExt;
//!
//! # async fn example() -> Result< (), Box< dyn std::error::Error > > {
//! let config = Config::new()
//!   .with_account_id( "my-account" )
//!   .with_access_key( "my-access-key" )
//!   .with_secret( "my-secret" )
//!   .with_endpoint( "db.example.com:8998" )
//!   .with_service( "peer-server" )
//!   .with_region( "none" )
//!   .with_db_name( "inventory" );
//!
//! let conn = connect( config ).await?;
//!
//! // Submit a transaction.
//! let report = conn.transact( TransactInput::new( Value::Vector( vec![] ) ) ).await?;
//! println!( "tempids : {}", report.tempids );
//!
//! // Stream a query result chunk by chunk.
//! let mut chunks = conn.q( QInput::new( Value::from( "[:find ?e :where [?e :db/ident]]" ), vec![] ) );
//! while let Some( chunk ) = chunks.next().await
//! {
//!   println!( "chunk : {}", chunk? );
//! }
//! # Ok( () )
//! # }
//! ```

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer anomaly;
  layer value;
  layer datom;
  layer codec;
  layer config;
  layer endpoint;
  layer signing;
  layer transport;
  layer request;
  layer classify;
  layer retry;
  layer dispatch;
  layer chunked;
  layer cache;
  layer connection;
  layer client;
}
