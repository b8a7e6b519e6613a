//! Connect to a database and stream a query result.
//!
//! Expects the `DATOMIC_*` environment variables (or `~/.datomic/config`)
//! to describe a reachable peer-server, plus `DATOMIC_DB_NAME` here for
//! the database to open.

use api_datomic::{ connect, Config, Conn, QInput, Value };
use futures_util::StreamExt;

#[ tokio::main ]
async fn main() -> Result< (), Box< dyn std::error::Error > >
{
  let db_name = std::env::var( "DATOMIC_DB_NAME" ).unwrap_or_else( | _ | "movies".to_string() );
  let conn = connect( Config::new().with_db_name( db_name ) ).await?;

  println!( "connected : {:?}", conn.state() );

  let query = Value::from( "[:find ?e ?ident :where [?e :db/ident ?ident]]" );
  let mut chunks = conn.q( QInput::new( query, vec![] ).with_chunk( 100 ) );
  while let Some( chunk ) = chunks.next().await
  {
    match chunk
    {
      Ok( data ) => println!( "chunk : {data}" ),
      Err( anomaly ) =>
      {
        eprintln!( "query failed : {anomaly}" );
        break;
      }
    }
  }

  conn.shutdown();
  Ok( () )
}
