//! Chunked response driver : re-issue `next` requests while the server
//! reports more data, yielding one chunk per response.

mod private
{
  use core::pin::Pin;
  use std::sync::Arc;

  use async_stream::stream;
  use futures_core::Stream;

  use crate::{ Anomaly, ApiRequest, ConnectionImpl, DatomicResult, Op, Value, request_response };

  /// Default starting offset of a chunked read.
  pub const DEFAULT_OFFSET : i64 = 0;
  /// Default result limit of a chunked read.
  pub const DEFAULT_LIMIT : i64 = 1000;
  /// Limit sentinel for an unbounded read.
  pub const UNBOUNDED_LIMIT : i64 = -1;
  /// Default chunk size.
  pub const DEFAULT_CHUNK : i64 = 1000;
  /// Upper bound on the chunk size.
  pub const MAX_CHUNK : i64 = 10_000;
  /// Default timeout of a query, in milliseconds.
  pub const QUERY_TIMEOUT_MSEC : u64 = 60_000;

  /// A stream of chunks. An anomaly terminates the stream after being
  /// yielded.
  pub type ChunkStream = Pin< Box< dyn Stream< Item = DatomicResult< Value > > + Send > >;

  /// Drive a chunked operation.
  ///
  /// The first response comes from a normal dispatcher call. While a
  /// response carries `next-offset`, a follow-up `next` request is issued
  /// with the token, offset, and chunk size copied forward. Each
  /// response's `extract` field is yielded as one chunk. The stream is
  /// pull-driven : no follow-up request is issued until the consumer
  /// polls for the next chunk, so consumers exert backpressure on
  /// fetching.
  #[ must_use ]
  pub fn chunk_stream
  (
    conn : Arc< ConnectionImpl >,
    request : ApiRequest,
    extract : &'static str,
  )
  -> ChunkStream
  {
    Box::pin( stream!
    {
      let chunk_size = request.payload.get( "chunk" ).cloned();
      let mut response = request_response( &conn, request ).await;
      loop
      {
        match response
        {
          Err( anomaly ) =>
          {
            yield Err( anomaly );
            return;
          }
          Ok( body ) =>
          {
            let chunk = body.get( extract ).cloned().unwrap_or( Value::Nil );
            yield Ok( chunk );

            let Some( next_offset ) = body.get( "next-offset" ).cloned() else { return };
            let mut payload = Value::record( [ ( "next-offset", next_offset ) ] );
            if let Some( chunk_size ) = body.get( "chunk" ).cloned().or_else( || chunk_size.clone() )
            {
              payload = payload.assoc( "chunk", chunk_size );
            }
            let mut next_request = ApiRequest::new( Op::Next, payload );
            if let Some( token ) = body.get( "next-token" ).and_then( token_text )
            {
              next_request = next_request.with_next_token( token );
            }
            response = request_response( &conn, next_request ).await;
          }
        }
      }
    } )
  }

  /// A stream that yields one anomaly and terminates, for failures
  /// detected before anything is submitted.
  #[ must_use ]
  pub fn failed_stream( anomaly : Anomaly ) -> ChunkStream
  {
    Box::pin( stream!
    {
      yield Err( anomaly );
    } )
  }

  fn token_text( value : &Value ) -> Option< String >
  {
    match value
    {
      Value::Str( s ) => Some( s.clone() ),
      Value::Uuid( u ) => Some( u.to_string() ),
      Value::Int( i ) => Some( i.to_string() ),
      _ => None,
    }
  }
}

crate::mod_interface!
{
  exposed use ChunkStream;
  exposed use chunk_stream;
  exposed use failed_stream;
  exposed use DEFAULT_OFFSET;
  exposed use DEFAULT_LIMIT;
  exposed use UNBOUNDED_LIMIT;
  exposed use DEFAULT_CHUNK;
  exposed use MAX_CHUNK;
  exposed use QUERY_TIMEOUT_MSEC;
}
