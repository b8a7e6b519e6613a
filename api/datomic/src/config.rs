//! Connection configuration : resolution, merging, validation.
//!
//! A configuration is assembled from built-in defaults, the `DATOMIC_*`
//! environment variables, and user-supplied arguments, in that precedence.
//! When the merged result is still incomplete, the home-directory file
//! `~/.datomic/config` is consulted underneath the accumulated fields.

mod private
{
  use std::collections::HashMap;
  use std::path::{ Path, PathBuf };

  use error_tools::untyped::Result;

  use crate::{ Anomaly, DatomicResult };

  /// Account id accepted for the on-premises peer-server mode.
  pub const PRO_ACCOUNT : &str = "00000000-0000-0000-0000-000000000000";
  /// Region accepted for the on-premises peer-server mode.
  pub const PRO_REGION : &str = "none";
  /// Request timeout applied when none is configured, in milliseconds.
  pub const DEFAULT_TIMEOUT_MSEC : u64 = 60_000;

  const ENV_VARS : [ ( &str, &str ); 6 ] =
  [
    ( "DATOMIC_ACCOUNT_ID", "account-id" ),
    ( "DATOMIC_ACCESS_KEY", "access-key" ),
    ( "DATOMIC_SECRET", "secret" ),
    ( "DATOMIC_ENDPOINT", "endpoint" ),
    ( "DATOMIC_SERVICE", "service" ),
    ( "DATOMIC_REGION", "region" ),
  ];

  /// Connection configuration.
  ///
  /// All six credential/endpoint fields must be non-empty strings before a
  /// connection is built; `validate` enforces that. Equality and hashing
  /// are field-wise : a validated configuration keys the connection cache
  /// by value.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::Config;
  ///
  /// let config = Config::new()
  ///   .with_account_id( "my-account" )
  ///   .with_endpoint( "db.example.com:8998" )
  ///   .with_db_name( "inventory" );
  /// assert_eq!( config.endpoint.as_deref(), Some( "db.example.com:8998" ) );
  /// ```
  #[ derive( Clone, Default, PartialEq, Eq, Hash ) ]
  pub struct Config
  {
    /// Account identifier, or [`PRO_ACCOUNT`] for peer-server mode.
    pub account_id : Option< String >,
    /// Access key presented in the signature credential.
    pub access_key : Option< String >,
    /// Signing secret. Redacted from `Debug` output.
    pub secret : Option< String >,
    /// `host` or `host:port` of the service.
    pub endpoint : Option< String >,
    /// Signing service name.
    pub service : Option< String >,
    /// Signing region, or [`PRO_REGION`] for peer-server mode.
    pub region : Option< String >,
    /// Per-request timeout in milliseconds. Defaults to [`DEFAULT_TIMEOUT_MSEC`].
    pub timeout : Option< u64 >,
    /// Database this configuration connects to.
    pub db_name : Option< String >,
  }

  impl core::fmt::Debug for Config
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "Config" )
        .field( "account_id", &self.account_id )
        .field( "access_key", &self.access_key )
        .field( "secret", &self.secret.as_ref().map( | _ | "< REDACTED >" ) )
        .field( "endpoint", &self.endpoint )
        .field( "service", &self.service )
        .field( "region", &self.region )
        .field( "timeout", &self.timeout )
        .field( "db_name", &self.db_name )
        .finish()
    }
  }

  impl Config
  {
    /// Empty configuration.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Set the account id.
    #[ must_use ]
    pub fn with_account_id( mut self, account_id : impl Into< String > ) -> Self
    {
      self.account_id = Some( account_id.into() );
      self
    }

    /// Set the access key.
    #[ must_use ]
    pub fn with_access_key( mut self, access_key : impl Into< String > ) -> Self
    {
      self.access_key = Some( access_key.into() );
      self
    }

    /// Set the signing secret.
    #[ must_use ]
    pub fn with_secret( mut self, secret : impl Into< String > ) -> Self
    {
      self.secret = Some( secret.into() );
      self
    }

    /// Set the endpoint, `host` or `host:port`.
    #[ must_use ]
    pub fn with_endpoint( mut self, endpoint : impl Into< String > ) -> Self
    {
      self.endpoint = Some( endpoint.into() );
      self
    }

    /// Set the signing service name.
    #[ must_use ]
    pub fn with_service( mut self, service : impl Into< String > ) -> Self
    {
      self.service = Some( service.into() );
      self
    }

    /// Set the signing region.
    #[ must_use ]
    pub fn with_region( mut self, region : impl Into< String > ) -> Self
    {
      self.region = Some( region.into() );
      self
    }

    /// Set the per-request timeout in milliseconds.
    #[ must_use ]
    pub fn with_timeout( mut self, timeout : u64 ) -> Self
    {
      self.timeout = Some( timeout );
      self
    }

    /// Set the database name.
    #[ must_use ]
    pub fn with_db_name( mut self, db_name : impl Into< String > ) -> Self
    {
      self.db_name = Some( db_name.into() );
      self
    }

    /// True when all six credential/endpoint fields are non-empty strings.
    #[ must_use ]
    pub fn is_valid( &self ) -> bool
    {
      [
        &self.account_id,
        &self.access_key,
        &self.secret,
        &self.endpoint,
        &self.service,
        &self.region,
      ]
      .into_iter()
      .all( | field | field.as_deref().is_some_and( | s | !s.is_empty() ) )
    }

    /// Overlay `over`'s present fields onto this configuration.
    #[ must_use ]
    pub fn merge_over( mut self, over : Self ) -> Self
    {
      self.account_id = over.account_id.or( self.account_id );
      self.access_key = over.access_key.or( self.access_key );
      self.secret = over.secret.or( self.secret );
      self.endpoint = over.endpoint.or( self.endpoint );
      self.service = over.service.or( self.service );
      self.region = over.region.or( self.region );
      self.timeout = over.timeout.or( self.timeout );
      self.db_name = over.db_name.or( self.db_name );
      self
    }

    /// Fill this configuration's absent fields from `under`.
    #[ must_use ]
    pub fn merge_under( self, under : Self ) -> Self
    {
      under.merge_over( self )
    }

    fn set_field( &mut self, key : &str, value : &str )
    {
      let value = value.to_string();
      match key
      {
        "account-id" => self.account_id = Some( value ),
        "access-key" => self.access_key = Some( value ),
        "secret" => self.secret = Some( value ),
        "endpoint" => self.endpoint = Some( value ),
        "service" => self.service = Some( value ),
        "region" => self.region = Some( value ),
        "db-name" => self.db_name = Some( value ),
        "timeout" => self.timeout = value.parse().ok(),
        _ => {}
      }
    }
  }

  /// Configuration read from the `DATOMIC_*` environment variables.
  /// Unset and empty variables contribute nothing.
  #[ must_use ]
  pub fn env_config() -> Config
  {
    let mut config = Config::new();
    for ( var, key ) in ENV_VARS
    {
      if let Ok( value ) = std::env::var( var )
      {
        if !value.is_empty()
        {
          config.set_field( key, &value );
        }
      }
    }
    config
  }

  /// Path of the home-directory configuration file, `~/.datomic/config`.
  #[ must_use ]
  pub fn home_config_path() -> Option< PathBuf >
  {
    let home = std::env::var_os( "HOME" )?;
    Some( PathBuf::from( home ).join( ".datomic" ).join( "config" ) )
  }

  /// Configuration read from a newline-delimited `key=value` file.
  ///
  /// An absent file contributes nothing. A present but unparsable file
  /// prints `Unable to parse <path>` on standard error and also
  /// contributes nothing.
  #[ must_use ]
  pub fn home_config( path : &Path ) -> Config
  {
    let Ok( text ) = std::fs::read_to_string( path ) else
    {
      return Config::new();
    };
    match parse_config_text( &text )
    {
      Ok( config ) => config,
      Err( _err ) =>
      {
        eprintln!( "Unable to parse {}", path.display() );
        #[ cfg( feature = "logging" ) ]
        tracing::warn!( path = %path.display(), "home config file ignored" );
        Config::new()
      }
    }
  }

  fn parse_config_text( text : &str ) -> Result< Config >
  {
    let mut fields = HashMap::new();
    for line in text.lines()
    {
      let line = line.trim();
      if line.is_empty()
      {
        continue;
      }
      let Some( ( key, value ) ) = line.split_once( '=' ) else
      {
        return Err( error_tools::Error::msg( format!( "line without '=' : {line}" ) ) );
      };
      fields.insert( key.trim().to_string(), value.trim().to_string() );
    }
    let mut config = Config::new();
    for ( key, value ) in &fields
    {
      config.set_field( key, value );
    }
    Ok( config )
  }

  /// Merge configuration sources with the defined precedence :
  /// defaults, then environment, then user arguments; the home file is
  /// consulted underneath only when the merged result is still invalid.
  #[ must_use ]
  pub fn resolve_from_sources< F >( user : Config, env : Config, home : F ) -> Config
  where
    F : FnOnce() -> Config,
  {
    let defaults = Config::new().with_timeout( DEFAULT_TIMEOUT_MSEC );
    let merged = defaults.merge_over( env ).merge_over( user );
    if merged.is_valid()
    {
      merged
    }
    else
    {
      merged.merge_under( home() )
    }
  }

  /// Resolve a configuration from user arguments, the environment, and the
  /// home file.
  ///
  /// # Errors
  ///
  /// Currently infallible; the signature reserves the incorrect-anomaly
  /// arm for source readers that can fail outright.
  pub fn resolve( user : Config ) -> DatomicResult< Config >
  {
    Ok( resolve_from_sources( user, env_config(), || {
      home_config_path().map( | path | home_config( &path ) ).unwrap_or_default()
    } ) )
  }

  /// Return the configuration unchanged when it is complete, otherwise an
  /// `incorrect` anomaly.
  ///
  /// # Errors
  ///
  /// Returns an `incorrect` anomaly naming the (secret-redacted)
  /// configuration when any of the six required fields is absent or empty.
  pub fn validate( config : Config ) -> DatomicResult< Config >
  {
    if config.is_valid()
    {
      Ok( config )
    }
    else
    {
      Err( Anomaly::incorrect( format!( "Incomplete or invalid connection config: {config:?}" ) ) )
    }
  }
}

crate::mod_interface!
{
  exposed use Config;
  exposed use resolve;
  exposed use resolve_from_sources;
  exposed use validate;
  exposed use env_config;
  exposed use home_config;
  exposed use home_config_path;
  exposed use PRO_ACCOUNT;
  exposed use PRO_REGION;
  exposed use DEFAULT_TIMEOUT_MSEC;
}
