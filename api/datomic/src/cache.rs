//! Process-wide connection cache : one live connection per validated
//! configuration, with O(1) lookups in every direction.

mod private
{
  use std::collections::HashMap;

  use once_cell::sync::Lazy;
  use parking_lot::Mutex;

  use crate::{ Config, Connection };

  static GLOBAL_CACHE : Lazy< ConnectionCache > = Lazy::new( ConnectionCache::new );

  #[ derive( Debug, Default ) ]
  struct CacheState
  {
    config_to_id : HashMap< Config, String >,
    id_to_conn : HashMap< String, Connection >,
    conn_to_config : HashMap< usize, Config >,
  }

  /// Three synchronized mappings : config → database-id → connection →
  /// config. Every mutation takes the one lock, so readers always observe
  /// a consistent snapshot. No lock is held across I/O.
  #[ derive( Debug, Default ) ]
  pub struct ConnectionCache
  {
    state : Mutex< CacheState >,
  }

  impl ConnectionCache
  {
    /// An empty cache. Production code uses [`ConnectionCache::global`];
    /// fresh instances serve isolated tests.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// The process-wide cache.
    #[ must_use ]
    pub fn global() -> &'static Self
    {
      &GLOBAL_CACHE
    }

    /// Install all three directions for one connection.
    pub fn put( &self, config : Config, database_id : String, connection : Connection )
    {
      let mut state = self.state.lock();
      state.conn_to_config.insert( connection.impl_identity(), config.clone() );
      state.config_to_id.insert( config, database_id.clone() );
      state.id_to_conn.insert( database_id, connection );
    }

    /// The interned connection for a configuration, if any.
    #[ must_use ]
    pub fn lookup_by_config( &self, config : &Config ) -> Option< Connection >
    {
      let state = self.state.lock();
      let database_id = state.config_to_id.get( config )?;
      state.id_to_conn.get( database_id ).cloned()
    }

    /// The interned connection for a database identifier, if any.
    #[ must_use ]
    pub fn lookup_by_database_id( &self, database_id : &str ) -> Option< Connection >
    {
      self.state.lock().id_to_conn.get( database_id ).cloned()
    }

    /// Remove all three entries reachable from a connection. No-op when
    /// any link is already missing.
    pub fn forget_conn( &self, connection : &Connection )
    {
      let mut state = self.state.lock();
      let identity = connection.impl_identity();
      let Some( config ) = state.conn_to_config.get( &identity ).cloned() else { return };
      let Some( database_id ) = state.config_to_id.get( &config ).cloned() else { return };
      state.conn_to_config.remove( &identity );
      state.config_to_id.remove( &config );
      state.id_to_conn.remove( &database_id );
    }

    /// Remove all three entries reachable from a configuration. No-op
    /// when any link is already missing.
    pub fn forget_config( &self, config : &Config )
    {
      let mut state = self.state.lock();
      let Some( database_id ) = state.config_to_id.get( config ).cloned() else { return };
      let Some( connection ) = state.id_to_conn.get( &database_id ).cloned() else { return };
      state.conn_to_config.remove( &connection.impl_identity() );
      state.config_to_id.remove( config );
      state.id_to_conn.remove( &database_id );
    }

    /// Number of interned connections.
    #[ must_use ]
    pub fn len( &self ) -> usize
    {
      self.state.lock().id_to_conn.len()
    }

    /// True when nothing is interned.
    #[ must_use ]
    pub fn is_empty( &self ) -> bool
    {
      self.len() == 0
    }

    /// True when the three mappings remain mutually invertible : every
    /// config → id entry has an id → conn entry, and that connection maps
    /// back to the same config.
    #[ must_use ]
    pub fn is_consistent( &self ) -> bool
    {
      let state = self.state.lock();
      if state.config_to_id.len() != state.id_to_conn.len()
        || state.id_to_conn.len() != state.conn_to_config.len()
      {
        return false;
      }
      state.config_to_id.iter().all( | ( config, database_id ) |
      {
        state
          .id_to_conn
          .get( database_id )
          .and_then( | conn | state.conn_to_config.get( &conn.impl_identity() ) )
          .is_some_and( | back | back == config )
      } )
    }
  }
}

crate::mod_interface!
{
  exposed use ConnectionCache;
}
