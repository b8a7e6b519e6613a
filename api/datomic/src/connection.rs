//! Connection state : the watermark cell, the connection implementation,
//! the public connection handle, and the database descriptor.

mod private
{
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::
  {
    Anomaly, Config, DatomicResult, Endpoint, SigningParams, Transport, Value,
    parse_endpoint, DEFAULT_TIMEOUT_MSEC,
  };

  /// The most recently observed database point : `( t, next-t )`.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Default ) ]
  pub struct Watermark
  {
    /// Basis point.
    pub t : u64,
    /// Next point, always `>= t`.
    pub next_t : u64,
  }

  /// Mutable watermark cell owned by one connection.
  ///
  /// The only mutation is a monotonic advance : a new pair replaces the
  /// old iff its `t` is strictly greater, so concurrent responses applied
  /// in any order settle on the maximum.
  #[ derive( Debug, Default ) ]
  pub struct WatermarkCell
  {
    inner : Mutex< Watermark >,
  }

  impl WatermarkCell
  {
    /// Fresh cell at `{ 0, 0 }`.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Snapshot the current watermark.
    #[ must_use ]
    pub fn read( &self ) -> Watermark
    {
      *self.inner.lock()
    }

    /// Monotonic advance. Returns true when the new pair was installed;
    /// losing racers observe a no-op.
    pub fn advance( &self, next : Watermark ) -> bool
    {
      let next = Watermark { t : next.t, next_t : next.next_t.max( next.t ) };
      let mut current = self.inner.lock();
      if next.t > current.t
      {
        #[ cfg( feature = "logging" ) ]
        tracing::debug!( from = current.t, to = next.t, "watermark advance" );
        *current = next;
        true
      }
      else
      {
        false
      }
    }
  }

  /// Everything one live connection needs to issue requests.
  #[ derive( Debug ) ]
  pub struct ConnectionImpl
  {
    /// The validated configuration this connection was built from.
    pub config : Config,
    /// Parsed endpoint.
    pub endpoint : Endpoint,
    /// Account identifier.
    pub account_id : String,
    /// Database name, absent on throwaway administrative impls.
    pub db_name : Option< String >,
    /// Resolved database identifier, absent until catalog resolution.
    pub database_id : Option< String >,
    /// Default per-request timeout in milliseconds.
    pub timeout : u64,
    /// Signing credentials.
    pub signing : SigningParams,
    /// Shared watermark state.
    pub state : WatermarkCell,
    /// The submit facility.
    pub transport : Arc< dyn Transport >,
  }

  impl ConnectionImpl
  {
    /// Build from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an `incorrect` anomaly when the endpoint is absent or
    /// malformed.
    pub fn from_config( config : Config, transport : Arc< dyn Transport > ) -> DatomicResult< Self >
    {
      let endpoint = parse_endpoint( config.endpoint.as_deref() )?
        .ok_or_else( || Anomaly::incorrect( "connection config carries no endpoint" ) )?;
      let signing = SigningParams
      {
        access_key : config.access_key.clone().unwrap_or_default(),
        secret : config.secret.clone().unwrap_or_default(),
        service : config.service.clone().unwrap_or_default(),
        region : config.region.clone().unwrap_or_default(),
      };
      Ok( Self
      {
        account_id : config.account_id.clone().unwrap_or_default(),
        db_name : config.db_name.clone(),
        database_id : None,
        timeout : config.timeout.unwrap_or( DEFAULT_TIMEOUT_MSEC ),
        endpoint,
        signing,
        state : WatermarkCell::new(),
        transport,
        config,
      } )
    }

    /// Attach the resolved database identifier.
    #[ must_use ]
    pub fn with_database_id( mut self, database_id : impl Into< String > ) -> Self
    {
      self.database_id = Some( database_id.into() );
      self
    }

    /// Detach the database name, for throwaway administrative impls.
    #[ must_use ]
    pub fn without_db_name( mut self ) -> Self
    {
      self.db_name = None;
      self
    }
  }

  /// Capability set a connection handle exposes.
  pub trait Conn
  {
    /// Account identifier.
    fn account_id( &self ) -> &str;
    /// Database name the connection was opened for.
    fn db_name( &self ) -> Option< &str >;
    /// Resolved database identifier.
    fn database_id( &self ) -> &str;
    /// Current watermark.
    fn state( &self ) -> Watermark;
    /// The underlying implementation.
    fn conn_impl( &self ) -> &Arc< ConnectionImpl >;
  }

  /// A logical connection handle. Cheap to clone; all clones share the
  /// same implementation and watermark.
  #[ derive( Debug, Clone ) ]
  pub struct Connection
  {
    implementation : Arc< ConnectionImpl >,
  }

  impl Connection
  {
    /// Wrap a finished implementation.
    #[ must_use ]
    pub fn from_impl( implementation : Arc< ConnectionImpl > ) -> Self
    {
      Self { implementation }
    }

    /// Identity of the shared implementation, used by the connection
    /// cache's reverse mapping.
    #[ must_use ]
    pub fn impl_identity( &self ) -> usize
    {
      Arc::as_ptr( &self.implementation ) as usize
    }

    /// Snapshot the current database point as an immutable descriptor.
    /// Purely local, no network traffic.
    #[ must_use ]
    pub fn db( &self ) -> Db
    {
      let watermark = self.implementation.state.read();
      Db::from_parts
      (
        Arc::clone( &self.implementation ),
        self.database_id().to_string(),
        watermark.t,
        watermark.next_t,
      )
    }

    /// Descriptor of this connection's transaction log. Purely local.
    #[ must_use ]
    pub fn log( &self ) -> Value
    {
      Value::record( [ ( "log", Value::from( self.database_id().to_string() ) ) ] )
    }
  }

  impl Conn for Connection
  {
    fn account_id( &self ) -> &str
    {
      &self.implementation.account_id
    }

    fn db_name( &self ) -> Option< &str >
    {
      self.implementation.db_name.as_deref()
    }

    fn database_id( &self ) -> &str
    {
      self.implementation.database_id.as_deref().unwrap_or( "" )
    }

    fn state( &self ) -> Watermark
    {
      self.implementation.state.read()
    }

    fn conn_impl( &self ) -> &Arc< ConnectionImpl >
    {
      &self.implementation
    }
  }

  /// An immutable database descriptor : a database value at a point, a
  /// range, or across history.
  #[ derive( Debug, Clone ) ]
  pub struct Db
  {
    implementation : Arc< ConnectionImpl >,
    /// Database identifier.
    pub database_id : String,
    /// Basis point of the snapshot.
    pub t : u64,
    /// Next point of the snapshot.
    pub next_t : u64,
    /// Pin reads at or before this point.
    pub as_of : Option< i64 >,
    /// Restrict reads to facts after this point.
    pub since : Option< i64 >,
    /// Include retracted facts across all of time.
    pub history : bool,
    /// Continuation token of a speculative database from `with-db`.
    pub next_token : Option< String >,
  }

  impl Db
  {
    /// Assemble a plain snapshot descriptor.
    #[ must_use ]
    pub fn from_parts
    (
      implementation : Arc< ConnectionImpl >,
      database_id : String,
      t : u64,
      next_t : u64,
    )
    -> Self
    {
      Self
      {
        implementation,
        database_id,
        t,
        next_t,
        as_of : None,
        since : None,
        history : false,
        next_token : None,
      }
    }

    /// The descriptor pinned at or before `t`.
    #[ must_use ]
    pub fn as_of( mut self, t : i64 ) -> Self
    {
      self.as_of = Some( t );
      self
    }

    /// The descriptor restricted to facts after `t`.
    #[ must_use ]
    pub fn since( mut self, t : i64 ) -> Self
    {
      self.since = Some( t );
      self
    }

    /// The descriptor spanning all of history.
    #[ must_use ]
    pub fn history( mut self ) -> Self
    {
      self.history = true;
      self
    }

    /// Attach a speculative continuation token.
    #[ must_use ]
    pub fn with_next_token( mut self, next_token : impl Into< String > ) -> Self
    {
      self.next_token = Some( next_token.into() );
      self
    }

    /// The implementation requests against this descriptor go through.
    #[ must_use ]
    pub fn conn_impl( &self ) -> &Arc< ConnectionImpl >
    {
      &self.implementation
    }

    /// The descriptor as a request payload mapping : the database identity
    /// and the time modifiers. The local `t`/`next-t` snapshot stays out of
    /// the payload; the transaction slot of a read is implicit in it.
    #[ must_use ]
    pub fn descriptor( &self ) -> Value
    {
      let mut payload = Value::record
      (
        [
          ( "database-id", Value::from( self.database_id.clone() ) ),
        ]
      );
      if let Some( t ) = self.as_of
      {
        payload = payload.assoc( "as-of", Value::Int( t ) );
      }
      if let Some( t ) = self.since
      {
        payload = payload.assoc( "since", Value::Int( t ) );
      }
      if self.history
      {
        payload = payload.assoc( "history", Value::Bool( true ) );
      }
      payload
    }
  }
}

crate::mod_interface!
{
  exposed use Watermark;
  exposed use WatermarkCell;
  exposed use ConnectionImpl;
  exposed use Conn;
  exposed use Connection;
  exposed use Db;
}
