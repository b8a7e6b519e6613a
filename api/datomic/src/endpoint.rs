//! Endpoint parsing : `host` or `host:port` into scheme/host/port.

mod private
{
  use once_cell::sync::Lazy;
  use regex::Regex;

  use crate::{ Anomaly, DatomicResult };

  /// Default port when the endpoint names none.
  pub const DEFAULT_PORT : u16 = 443;

  static ENDPOINT_PATTERN : Lazy< Regex > =
    Lazy::new( || Regex::new( r"^([A-Za-z0-9][A-Za-z0-9.-]*)(?::(\d{1,5}))?$" ).expect( "endpoint pattern compiles" ) );

  /// A parsed endpoint.
  #[ derive( Debug, Clone, PartialEq, Eq ) ]
  pub struct Endpoint
  {
    /// Always `https`.
    pub scheme : String,
    /// Host name or address.
    pub host : String,
    /// TCP port, default 443.
    pub port : u16,
  }

  /// Parse `host` or `host:port`.
  ///
  /// An absent or empty endpoint yields `None`, leaving configuration
  /// validation to report it. A present but malformed endpoint is an
  /// `incorrect` anomaly.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::parse_endpoint;
  ///
  /// let endpoint = parse_endpoint( Some( "example.com:8080" ) ).unwrap().unwrap();
  /// assert_eq!( endpoint.scheme, "https" );
  /// assert_eq!( endpoint.host, "example.com" );
  /// assert_eq!( endpoint.port, 8080 );
  /// assert!( parse_endpoint( Some( "::bad::" ) ).is_err() );
  /// ```
  ///
  /// # Errors
  ///
  /// Returns an `incorrect` anomaly when the text matches neither form.
  pub fn parse_endpoint( endpoint : Option< &str > ) -> DatomicResult< Option< Endpoint > >
  {
    let Some( text ) = endpoint else { return Ok( None ) };
    if text.is_empty()
    {
      return Ok( None );
    }
    let captures = ENDPOINT_PATTERN
      .captures( text )
      .ok_or_else( || Anomaly::incorrect( format!( "Invalid endpoint: {text}" ) ) )?;
    let host = captures[ 1 ].to_string();
    let port = match captures.get( 2 )
    {
      Some( digits ) => digits
        .as_str()
        .parse::< u16 >()
        .map_err( | _ | Anomaly::incorrect( format!( "Invalid endpoint port: {text}" ) ) )?,
      None => DEFAULT_PORT,
    };
    Ok( Some( Endpoint { scheme : "https".to_string(), host, port } ) )
  }
}

crate::mod_interface!
{
  exposed use Endpoint;
  exposed use parse_endpoint;
  exposed use DEFAULT_PORT;
}
