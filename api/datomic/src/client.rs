//! Client facade : `connect`, the read and transaction operations, and
//! the administrative triad.

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;

  use once_cell::sync::Lazy;
  use parking_lot::Mutex;

  use crate::
  {
    Anomaly, ApiRequest, Conn, Config, Connection, ConnectionCache, ConnectionImpl,
    ChunkStream, DatomicResult, Db, Op, Transport, Value, Watermark,
    chunk_stream, failed_stream, request_response, resolve, shared_transport, validate,
    DEFAULT_CHUNK, DEFAULT_LIMIT, DEFAULT_OFFSET, MAX_CHUNK, QUERY_TIMEOUT_MSEC,
  };

  /// Index orderings available to [`Db::datoms`].
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Default ) ]
  pub enum Index
  {
    /// Entity, attribute, value, transaction.
    #[ default ]
    Eavt,
    /// Attribute, entity, value, transaction.
    Aevt,
    /// Attribute, value, entity, transaction.
    Avet,
    /// Value, attribute, entity, transaction.
    Vaet,
  }

  impl Index
  {
    /// The index name as sent on the wire.
    #[ must_use ]
    pub fn as_str( self ) -> &'static str
    {
      match self
      {
        Self::Eavt => "eavt",
        Self::Aevt => "aevt",
        Self::Avet => "avet",
        Self::Vaet => "vaet",
      }
    }

    /// Positional component keys in this index's order. The fourth slot
    /// is implicit in the database snapshot and never bound explicitly.
    #[ must_use ]
    pub fn positions( self ) -> [ &'static str; 4 ]
    {
      match self
      {
        Self::Eavt => [ "e", "a", "v", "t" ],
        Self::Aevt => [ "a", "e", "v", "t" ],
        Self::Avet => [ "a", "v", "e", "t" ],
        Self::Vaet => [ "v", "a", "e", "t" ],
      }
    }
  }

  /// Input of [`Db::datoms`].
  #[ derive( Debug, Clone, Default ) ]
  pub struct DatomsInput
  {
    /// Index ordering to scan.
    pub index : Index,
    /// Leading components bound positionally, at most three.
    pub components : Vec< Value >,
    /// Timeout override in milliseconds.
    pub timeout : Option< u64 >,
    /// Starting offset.
    pub offset : Option< i64 >,
    /// Result limit, `-1` for unbounded.
    pub limit : Option< i64 >,
    /// Chunk size.
    pub chunk : Option< i64 >,
    /// Unrecognized fields passed through to the wire.
    pub extra : Value,
  }

  impl DatomsInput
  {
    /// Scan the given index.
    #[ must_use ]
    pub fn new( index : Index ) -> Self
    {
      Self { index, ..Self::default() }
    }

    /// Bind the leading components.
    #[ must_use ]
    pub fn with_components( mut self, components : Vec< Value > ) -> Self
    {
      self.components = components;
      self
    }

    /// Set the starting offset.
    #[ must_use ]
    pub fn with_offset( mut self, offset : i64 ) -> Self
    {
      self.offset = Some( offset );
      self
    }

    /// Set the result limit.
    #[ must_use ]
    pub fn with_limit( mut self, limit : i64 ) -> Self
    {
      self.limit = Some( limit );
      self
    }

    /// Set the chunk size.
    #[ must_use ]
    pub fn with_chunk( mut self, chunk : i64 ) -> Self
    {
      self.chunk = Some( chunk );
      self
    }

    /// Pass extra fields through to the wire.
    #[ must_use ]
    pub fn with_extra( mut self, extra : Value ) -> Self
    {
      self.extra = extra;
      self
    }
  }

  /// Input of [`Db::index_range`].
  #[ derive( Debug, Clone ) ]
  pub struct IndexRangeInput
  {
    /// Attribute whose values are scanned.
    pub attrid : Value,
    /// Inclusive start of the value range.
    pub start : Option< Value >,
    /// Exclusive end of the value range.
    pub end : Option< Value >,
    /// Starting offset.
    pub offset : Option< i64 >,
    /// Result limit, `-1` for unbounded.
    pub limit : Option< i64 >,
    /// Chunk size.
    pub chunk : Option< i64 >,
    /// Unrecognized fields passed through to the wire.
    pub extra : Value,
  }

  impl IndexRangeInput
  {
    /// Scan the given attribute.
    #[ must_use ]
    pub fn new( attrid : Value ) -> Self
    {
      Self
      {
        attrid,
        start : None,
        end : None,
        offset : None,
        limit : None,
        chunk : None,
        extra : Value::Nil,
      }
    }

    /// Set the range start.
    #[ must_use ]
    pub fn with_start( mut self, start : Value ) -> Self
    {
      self.start = Some( start );
      self
    }

    /// Set the range end.
    #[ must_use ]
    pub fn with_end( mut self, end : Value ) -> Self
    {
      self.end = Some( end );
      self
    }
  }

  /// Input of [`Db::pull`].
  #[ derive( Debug, Clone ) ]
  pub struct PullInput
  {
    /// Selection pattern.
    pub selector : Value,
    /// Entity to pull.
    pub eid : Value,
    /// Timeout override in milliseconds.
    pub timeout : Option< u64 >,
  }

  impl PullInput
  {
    /// Pull `selector` for `eid`.
    #[ must_use ]
    pub fn new( selector : Value, eid : Value ) -> Self
    {
      Self { selector, eid, timeout : None }
    }
  }

  /// Input of [`Connection::q`].
  #[ derive( Debug, Clone ) ]
  pub struct QInput
  {
    /// The query form.
    pub query : Value,
    /// Query arguments.
    pub args : Vec< Value >,
    /// Timeout in milliseconds; queries default to 60 000.
    pub timeout : Option< u64 >,
    /// Starting offset.
    pub offset : Option< i64 >,
    /// Result limit, `-1` for unbounded.
    pub limit : Option< i64 >,
    /// Chunk size.
    pub chunk : Option< i64 >,
    /// Unrecognized fields passed through to the wire.
    pub extra : Value,
  }

  impl QInput
  {
    /// Run `query` with `args`.
    #[ must_use ]
    pub fn new( query : Value, args : Vec< Value > ) -> Self
    {
      Self
      {
        query,
        args,
        timeout : None,
        offset : None,
        limit : None,
        chunk : None,
        extra : Value::Nil,
      }
    }

    /// Set the query timeout.
    #[ must_use ]
    pub fn with_timeout( mut self, timeout_msec : u64 ) -> Self
    {
      self.timeout = Some( timeout_msec );
      self
    }

    /// Set the chunk size.
    #[ must_use ]
    pub fn with_chunk( mut self, chunk : i64 ) -> Self
    {
      self.chunk = Some( chunk );
      self
    }
  }

  /// Input of [`Connection::tx_range`].
  #[ derive( Debug, Clone, Default ) ]
  pub struct TxRangeInput
  {
    /// Inclusive start point.
    pub start : Option< i64 >,
    /// Exclusive end point.
    pub end : Option< i64 >,
    /// Starting offset.
    pub offset : Option< i64 >,
    /// Result limit, `-1` for unbounded.
    pub limit : Option< i64 >,
    /// Chunk size.
    pub chunk : Option< i64 >,
  }

  impl TxRangeInput
  {
    /// The whole available log range.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Set the start point.
    #[ must_use ]
    pub fn with_start( mut self, start : i64 ) -> Self
    {
      self.start = Some( start );
      self
    }

    /// Set the end point.
    #[ must_use ]
    pub fn with_end( mut self, end : i64 ) -> Self
    {
      self.end = Some( end );
      self
    }
  }

  /// Input of [`Connection::transact`] and [`Db::with`].
  #[ derive( Debug, Clone ) ]
  pub struct TransactInput
  {
    /// Transaction data : a vector of assertions, retractions, or entity
    /// mappings.
    pub tx_data : Value,
    /// Timeout override in milliseconds.
    pub timeout : Option< u64 >,
  }

  impl TransactInput
  {
    /// Submit `tx_data`.
    #[ must_use ]
    pub fn new( tx_data : Value ) -> Self
    {
      Self { tx_data, timeout : None }
    }
  }

  /// Result of [`Connection::transact`] and [`Db::with`].
  #[ derive( Debug, Clone ) ]
  pub struct TxResult
  {
    /// Database descriptor before the transaction.
    pub db_before : Value,
    /// Database descriptor after the transaction.
    pub db_after : Value,
    /// Facts asserted and retracted by the transaction.
    pub tx_data : Value,
    /// Resolution of temporary ids.
    pub tempids : Value,
    /// Unrecognized response fields, passed through.
    pub extra : Value,
  }

  impl TxResult
  {
    /// Pick the transaction fields out of a response body.
    #[ must_use ]
    pub fn from_body( body : &Value ) -> Self
    {
      let field = | name : &str | body.get( name ).cloned().unwrap_or( Value::Nil );
      let mut extra = body.clone();
      for name in [ "db-before", "db-after", "tx-data", "tempids" ]
      {
        if let Value::Map( map ) = &mut extra
        {
          map.remove( &Value::kw( name ) );
        }
      }
      Self
      {
        db_before : field( "db-before" ),
        db_after : field( "db-after" ),
        tx_data : field( "tx-data" ),
        tempids : field( "tempids" ),
        extra,
      }
    }
  }

  static CONNECT_LOCKS : Lazy< Mutex< HashMap< Config, Arc< tokio::sync::Mutex< () > > > > > =
    Lazy::new( || Mutex::new( HashMap::new() ) );

  fn connect_lock( config : &Config ) -> Arc< tokio::sync::Mutex< () > >
  {
    let mut locks = CONNECT_LOCKS.lock();
    locks
      .entry( config.clone() )
      .or_insert_with( || Arc::new( tokio::sync::Mutex::new( () ) ) )
      .clone()
  }

  /// Open (or re-use) the connection for a configuration.
  ///
  /// The configuration is resolved and validated, then interned : at most
  /// one connection exists per validated configuration, and at most one
  /// connect is in flight for it at a time. Concurrent callers of a
  /// cache-missing configuration receive the same connection; all but the
  /// installer win by re-reading the cache.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn connect( args : Config ) -> DatomicResult< Connection >
  {
    connect_with( args, shared_transport() ).await
  }

  /// [`connect`] with an explicit transport.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn connect_with( args : Config, transport : Arc< dyn Transport > ) -> DatomicResult< Connection >
  {
    let config = validate( resolve( args )? )?;
    let cache = ConnectionCache::global();
    if let Some( connection ) = cache.lookup_by_config( &config )
    {
      return Ok( connection );
    }

    let lock = connect_lock( &config );
    let _guard = lock.lock().await;
    if let Some( connection ) = cache.lookup_by_config( &config )
    {
      return Ok( connection );
    }

    let connection = build_connection( config.clone(), transport ).await?;
    cache.put( config, connection.database_id().to_string(), connection.clone() );
    #[ cfg( feature = "logging" ) ]
    tracing::debug!( database_id = connection.database_id(), "connection interned" );
    Ok( connection )
  }

  /// [`connect`] from the environment and home file alone.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn connect_env() -> DatomicResult< Connection >
  {
    connect( Config::new() ).await
  }

  async fn build_connection( config : Config, transport : Arc< dyn Transport > ) -> DatomicResult< Connection >
  {
    let db_name = config
      .db_name
      .clone()
      .ok_or_else( || Anomaly::incorrect( "connection config requires a db-name" ) )?;

    // Catalog resolution runs on an impl that has no database id yet.
    let resolver = Arc::new( ConnectionImpl::from_config( config.clone(), Arc::clone( &transport ) )? );
    let resolve_request = ApiRequest::new
    (
      Op::ResolveDb,
      Value::record( [ ( "db-name", Value::from( db_name ) ) ] ),
    );
    let body = request_response( &resolver, resolve_request ).await?;
    let database_id = body
      .get( "database-id" )
      .and_then( Value::as_str )
      .map( ToString::to_string )
      .ok_or_else( || Anomaly::fault( "resolve-db response carries no database-id" ) )?;

    // The real impl starts from a fresh watermark and the resolved id.
    let implementation = Arc::new
    (
      ConnectionImpl::from_config( config, transport )?.with_database_id( database_id.clone() ),
    );
    let status_request = ApiRequest::new
    (
      Op::Status,
      Value::record( [ ( "database-id", Value::from( database_id ) ) ] ),
    );
    let body = request_response( &implementation, status_request ).await?;
    if let ( Some( t ), Some( next_t ) ) =
      ( body.get( "t" ).and_then( Value::as_u64 ), body.get( "next-t" ).and_then( Value::as_u64 ) )
    {
      implementation.state.advance( Watermark { t, next_t } );
    }

    Ok( Connection::from_impl( implementation ) )
  }

  fn apply_window( mut payload : Value, offset : Option< i64 >, limit : Option< i64 >, chunk : Option< i64 > ) -> Value
  {
    payload = payload.assoc( "offset", Value::Int( offset.unwrap_or( DEFAULT_OFFSET ) ) );
    payload = payload.assoc( "limit", Value::Int( limit.unwrap_or( DEFAULT_LIMIT ) ) );
    payload = payload.assoc( "chunk", Value::Int( chunk.unwrap_or( DEFAULT_CHUNK ).min( MAX_CHUNK ) ) );
    payload
  }

  impl Connection
  {
    /// Run a declarative query, streaming `data` chunks.
    #[ must_use ]
    pub fn q( &self, input : QInput ) -> ChunkStream
    {
      let mut payload = Value::record
      (
        [
          ( "query", input.query ),
          ( "args", Value::Vector( input.args ) ),
        ]
      );
      payload = apply_window( payload, input.offset, input.limit, input.chunk );
      payload = payload.merge( input.extra );
      let request = ApiRequest::new( Op::Q, payload )
        .with_timeout( input.timeout.unwrap_or( QUERY_TIMEOUT_MSEC ) );
      chunk_stream( Arc::clone( self.conn_impl() ), request, "data" )
    }

    /// Read a range of the transaction log, streaming `data` chunks.
    #[ must_use ]
    pub fn tx_range( &self, input : TxRangeInput ) -> ChunkStream
    {
      let mut payload = Value::empty_map();
      if let Some( start ) = input.start
      {
        payload = payload.assoc( "start", Value::Int( start ) );
      }
      if let Some( end ) = input.end
      {
        payload = payload.assoc( "end", Value::Int( end ) );
      }
      payload = apply_window( payload, input.offset, input.limit, input.chunk );
      let request = ApiRequest::new( Op::TxRange, payload );
      chunk_stream( Arc::clone( self.conn_impl() ), request, "data" )
    }

    /// Submit a transaction. A fresh UUID identifies each submission.
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly of any pipeline stage.
    pub async fn transact( &self, input : TransactInput ) -> DatomicResult< TxResult >
    {
      let payload = Value::record
      (
        [
          ( "tx-data", input.tx_data ),
          ( "tx-id", Value::Uuid( uuid::Uuid::new_v4() ) ),
        ]
      );
      let mut request = ApiRequest::new( Op::Transact, payload );
      if let Some( timeout ) = input.timeout
      {
        request = request.with_timeout( timeout );
      }
      let body = request_response( self.conn_impl(), request ).await?;
      Ok( TxResult::from_body( &body ) )
    }

    /// Obtain a speculative database to feed [`Db::with`].
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly, or a `fault` when the response
    /// carries no continuation token.
    pub async fn with_db( &self ) -> DatomicResult< Db >
    {
      let request = ApiRequest::new( Op::WithDb, Value::empty_map() );
      let body = request_response( self.conn_impl(), request ).await?;
      let database_id = body
        .get( "database-id" )
        .and_then( Value::as_str )
        .map_or_else( || self.database_id().to_string(), ToString::to_string );
      let t = body.get( "t" ).and_then( Value::as_u64 ).unwrap_or( 0 );
      let next_t = body.get( "next-t" ).and_then( Value::as_u64 ).unwrap_or( t );
      let next_token = body
        .get( "next-token" )
        .and_then( Value::as_str )
        .map( ToString::to_string )
        .ok_or_else( || Anomaly::fault( "with-db response carries no next-token" ) )?;
      Ok
      (
        Db::from_parts( Arc::clone( self.conn_impl() ), database_id, t, next_t )
          .with_next_token( next_token ),
      )
    }

    /// Database statistics for the connection's current database.
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly of any pipeline stage.
    pub async fn db_stats( &self ) -> DatomicResult< Value >
    {
      self.db().db_stats().await
    }

    /// Remove this connection from the process-wide cache. Purely local :
    /// no network call, and already-obtained descriptors keep working
    /// against the in-memory state.
    pub fn shutdown( &self )
    {
      ConnectionCache::global().forget_conn( self );
    }
  }

  impl Db
  {
    /// Scan an index, streaming `data` chunks of fact tuples.
    ///
    /// Components bind positionally in the index's order; at most three
    /// may be given, the transaction slot being implicit in the snapshot.
    #[ must_use ]
    pub fn datoms( &self, input : DatomsInput ) -> ChunkStream
    {
      if input.components.len() > 3
      {
        return failed_stream( Anomaly::incorrect( "datoms accepts at most 3 components" ) );
      }
      let mut payload = self
        .descriptor()
        .assoc( "index", Value::kw( input.index.as_str() ) );
      let positions = input.index.positions();
      for ( position, component ) in input.components.iter().enumerate()
      {
        payload = payload.assoc( positions[ position ], component.clone() );
      }
      payload = apply_window( payload, input.offset, input.limit, input.chunk );
      payload = payload.merge( input.extra );
      let mut request = ApiRequest::new( Op::Datoms, payload );
      if let Some( timeout ) = input.timeout
      {
        request = request.with_timeout( timeout );
      }
      chunk_stream( Arc::clone( self.conn_impl() ), request, "data" )
    }

    /// Scan an attribute's value range, streaming `data` chunks.
    #[ must_use ]
    pub fn index_range( &self, input : IndexRangeInput ) -> ChunkStream
    {
      let mut payload = self.descriptor().assoc( "attrid", input.attrid );
      if let Some( start ) = input.start
      {
        payload = payload.assoc( "start", start );
      }
      if let Some( end ) = input.end
      {
        payload = payload.assoc( "end", end );
      }
      payload = apply_window( payload, input.offset, input.limit, input.chunk );
      payload = payload.merge( input.extra );
      let request = ApiRequest::new( Op::IndexRange, payload );
      chunk_stream( Arc::clone( self.conn_impl() ), request, "data" )
    }

    /// Pull a selection for one entity. An absent result is the empty
    /// mapping.
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly of any pipeline stage.
    pub async fn pull( &self, input : PullInput ) -> DatomicResult< Value >
    {
      let payload = self
        .descriptor()
        .assoc( "selector", input.selector )
        .assoc( "eid", input.eid );
      let mut request = ApiRequest::new( Op::Pull, payload );
      if let Some( timeout ) = input.timeout
      {
        request = request.with_timeout( timeout );
      }
      let body = request_response( self.conn_impl(), request ).await?;
      Ok( body.get( "result" ).cloned().unwrap_or_else( Value::empty_map ) )
    }

    /// Statistics for this database.
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly of any pipeline stage.
    pub async fn db_stats( &self ) -> DatomicResult< Value >
    {
      let request = ApiRequest::new( Op::DbStats, self.descriptor() );
      let body = request_response( self.conn_impl(), request ).await?;
      Ok( body.get( "result" ).cloned().unwrap_or( Value::Nil ) )
    }

    /// Apply a transaction speculatively against a `with-db` descriptor.
    ///
    /// # Panics
    ///
    /// Panics when the descriptor carries no continuation token; obtain
    /// the descriptor from [`Connection::with_db`].
    ///
    /// # Errors
    ///
    /// Propagates the classified anomaly of any pipeline stage.
    pub async fn with( &self, input : TransactInput ) -> DatomicResult< TxResult >
    {
      assert!( self.next_token.is_some(), "with requires a descriptor obtained from with-db" );
      let payload = self.descriptor().assoc( "tx-data", input.tx_data );
      let mut request = ApiRequest::new( Op::With, payload );
      if let Some( token ) = &self.next_token
      {
        request = request.with_next_token( token.clone() );
      }
      if let Some( timeout ) = input.timeout
      {
        request = request.with_timeout( timeout );
      }
      let body = request_response( self.conn_impl(), request ).await?;
      Ok( TxResult::from_body( &body ) )
    }
  }

  /// Create a database.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn create_database( args : Config ) -> DatomicResult< Value >
  {
    catalog_request( args, Op::CreateDb, shared_transport() ).await
  }

  /// Delete a database. The configuration is forgotten from the
  /// connection cache before the request is issued.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn delete_database( args : Config ) -> DatomicResult< Value >
  {
    catalog_request( args, Op::DeleteDb, shared_transport() ).await
  }

  /// List the databases the configuration can reach.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn list_databases( args : Config ) -> DatomicResult< Value >
  {
    catalog_request( args, Op::ListDbs, shared_transport() ).await
  }

  /// The administrative triad with an explicit transport.
  ///
  /// # Errors
  ///
  /// Propagates resolution, validation, and pipeline anomalies.
  pub async fn catalog_request( args : Config, op : Op, transport : Arc< dyn Transport > ) -> DatomicResult< Value >
  {
    let config = validate( resolve( args )? )?;

    let payload = match op
    {
      Op::CreateDb | Op::DeleteDb =>
      {
        let db_name = config
          .db_name
          .clone()
          .ok_or_else( || Anomaly::incorrect( format!( "{} requires a db-name", op.name() ) ) )?;
        Value::record( [ ( "db-name", Value::from( db_name ) ) ] )
      }
      _ => Value::empty_map(),
    };

    if op == Op::DeleteDb
    {
      ConnectionCache::global().forget_config( &config );
    }

    // Catalog calls run on a throwaway impl without a db-name.
    let implementation = Arc::new( ConnectionImpl::from_config( config, transport )?.without_db_name() );
    let body = request_response( &implementation, ApiRequest::new( op, payload ) ).await?;
    Ok( body.get( "result" ).cloned().unwrap_or( body ) )
  }
}

crate::mod_interface!
{
  exposed use Index;
  exposed use DatomsInput;
  exposed use IndexRangeInput;
  exposed use PullInput;
  exposed use QInput;
  exposed use TxRangeInput;
  exposed use TransactInput;
  exposed use TxResult;
  exposed use connect;
  exposed use connect_with;
  exposed use connect_env;
  exposed use create_database;
  exposed use delete_database;
  exposed use list_databases;
  exposed use catalog_request;
}
