//! HTTP transport : `submit( request, timeout ) -> response`.
//!
//! The rest of the pipeline only ever sees the [`Transport`] trait, so
//! pipeline tests drive it with scripted implementations. The production
//! implementation wraps a process-wide `reqwest` client whose trust
//! material is the system roots plus the bundled transactor certificate.

mod private
{
  use core::fmt;
  use core::time::Duration;
  use std::sync::Arc;

  use async_trait::async_trait;
  use bytes::Bytes;
  use once_cell::sync::Lazy;

  /// An outgoing request : always a POST, body already marshalled.
  #[ derive( Debug, Clone ) ]
  pub struct HttpRequest
  {
    /// URL scheme, `https`.
    pub scheme : String,
    /// Target host.
    pub host : String,
    /// Target port.
    pub port : u16,
    /// Request path, `/` for every protocol operation.
    pub path : String,
    /// Header name/value pairs in insertion order.
    pub headers : Vec< ( String, String ) >,
    /// Marshalled payload, exactly the signed bytes.
    pub body : Bytes,
  }

  impl HttpRequest
  {
    /// A bodyless POST to `/` on the given authority.
    #[ must_use ]
    pub fn new( scheme : impl Into< String >, host : impl Into< String >, port : u16 ) -> Self
    {
      Self
      {
        scheme : scheme.into(),
        host : host.into(),
        port,
        path : "/".to_string(),
        headers : Vec::new(),
        body : Bytes::new(),
      }
    }

    /// Full request URL.
    #[ must_use ]
    pub fn url( &self ) -> String
    {
      format!( "{}://{}:{}{}", self.scheme, self.host, self.port, self.path )
    }

    /// Case-insensitive header lookup.
    #[ must_use ]
    pub fn header( &self, name : &str ) -> Option< &str >
    {
      self
        .headers
        .iter()
        .find( | ( n, _ ) | n.eq_ignore_ascii_case( name ) )
        .map( | ( _, v ) | v.as_str() )
    }

    /// Insert or replace a header.
    pub fn set_header( &mut self, name : impl Into< String >, value : impl Into< String > )
    {
      let name = name.into();
      let value = value.into();
      match self.headers.iter_mut().find( | ( n, _ ) | n.eq_ignore_ascii_case( &name ) )
      {
        Some( entry ) => entry.1 = value,
        None => self.headers.push( ( name, value ) ),
      }
    }
  }

  /// A received response.
  #[ derive( Debug, Clone ) ]
  pub struct HttpResponse
  {
    /// HTTP status code.
    pub status : u16,
    /// `Content-Type` header, when present.
    pub content_type : Option< String >,
    /// Raw body bytes.
    pub body : Bytes,
  }

  /// Failure classes a transport can report. The response classifier maps
  /// each to an anomaly category.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum TransportErrorKind
  {
    /// The per-request deadline expired.
    Timeout,
    /// The transport itself throttled the request.
    Throttled,
    /// TCP/TLS connection could not be established.
    ConnectFailed,
    /// Host name did not resolve.
    ResolveFailed,
    /// Anything else.
    Other,
  }

  /// A transport-level failure, before any HTTP status exists.
  #[ derive( Debug, Clone, PartialEq, Eq ) ]
  pub struct TransportError
  {
    /// Failure class.
    pub kind : TransportErrorKind,
    /// Underlying error type and message, when available.
    pub message : Option< String >,
  }

  impl TransportError
  {
    /// Create an error of the given class.
    #[ must_use ]
    pub fn new( kind : TransportErrorKind ) -> Self
    {
      Self { kind, message : None }
    }

    /// Attach the underlying error's description.
    #[ must_use ]
    pub fn with_message( mut self, message : impl Into< String > ) -> Self
    {
      self.message = Some( message.into() );
      self
    }
  }

  impl fmt::Display for TransportError
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      match &self.message
      {
        Some( message ) => write!( f, "{:?} : {}", self.kind, message ),
        None => write!( f, "{:?}", self.kind ),
      }
    }
  }

  impl std::error::Error for TransportError {}

  /// The submit facility every request goes through.
  #[ async_trait ]
  pub trait Transport : fmt::Debug + Send + Sync
  {
    /// Submit a signed request, observing the per-request deadline.
    async fn submit( &self, request : HttpRequest, timeout : Duration )
      -> Result< HttpResponse, TransportError >;
  }

  /// Production transport over a shared `reqwest` client.
  #[ derive( Debug, Clone ) ]
  pub struct HttpTransport
  {
    client : reqwest::Client,
  }

  impl HttpTransport
  {
    /// Build the transport with the bundled trust material.
    ///
    /// # Panics
    ///
    /// Panics if the bundled certificate does not parse or the HTTP client
    /// fails to build.
    #[ must_use ]
    pub fn new() -> Self
    {
      let trust = reqwest::Certificate::from_pem( include_bytes!( "../certs/transactor-trust.pem" ) )
        .expect( "bundled trust certificate parses" );
      let client = reqwest::Client::builder()
        .use_rustls_tls()
        .add_root_certificate( trust )
        .build()
        .expect( "Failed to build HTTP client" );
      Self { client }
    }
  }

  impl Default for HttpTransport
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  #[ async_trait ]
  impl Transport for HttpTransport
  {
    async fn submit( &self, request : HttpRequest, timeout : Duration )
      -> Result< HttpResponse, TransportError >
    {
      let url = request.url();
      let mut headers = reqwest::header::HeaderMap::new();
      for ( name, value ) in &request.headers
      {
        let name = reqwest::header::HeaderName::from_bytes( name.as_bytes() )
          .map_err( | e | TransportError::new( TransportErrorKind::Other ).with_message( e.to_string() ) )?;
        let value = reqwest::header::HeaderValue::from_str( value )
          .map_err( | e | TransportError::new( TransportErrorKind::Other ).with_message( e.to_string() ) )?;
        headers.insert( name, value );
      }

      #[ cfg( feature = "logging" ) ]
      tracing::debug!( %url, timeout_msec = timeout.as_millis() as u64, "submitting request" );

      let response = self
        .client
        .post( &url )
        .headers( headers )
        .timeout( timeout )
        .body( request.body.clone() )
        .send()
        .await
        .map_err( classify_reqwest_error )?;

      let status = response.status().as_u16();
      let content_type = response
        .headers()
        .get( reqwest::header::CONTENT_TYPE )
        .and_then( | v | v.to_str().ok() )
        .map( ToString::to_string );
      let body = response.bytes().await.map_err( classify_reqwest_error )?;
      Ok( HttpResponse { status, content_type, body } )
    }
  }

  fn classify_reqwest_error( error : reqwest::Error ) -> TransportError
  {
    let kind = if error.is_timeout()
    {
      TransportErrorKind::Timeout
    }
    else if error.is_connect()
    {
      // reqwest folds resolution failures into connect errors; the error
      // chain text is the only discriminator left.
      if format!( "{error:?}" ).contains( "dns" )
      {
        TransportErrorKind::ResolveFailed
      }
      else
      {
        TransportErrorKind::ConnectFailed
      }
    }
    else
    {
      TransportErrorKind::Other
    };
    TransportError::new( kind ).with_message( format!( "reqwest::Error : {error}" ) )
  }

  static SHARED_TRANSPORT : Lazy< Arc< HttpTransport > > = Lazy::new( || Arc::new( HttpTransport::new() ) );

  /// The process-wide production transport, created lazily.
  #[ must_use ]
  pub fn shared_transport() -> Arc< dyn Transport >
  {
    SHARED_TRANSPORT.clone() as Arc< dyn Transport >
  }
}

crate::mod_interface!
{
  exposed use HttpRequest;
  exposed use HttpResponse;
  exposed use TransportError;
  exposed use TransportErrorKind;
  exposed use Transport;
  exposed use HttpTransport;
  exposed use shared_transport;
}
