//! Scripted transport : replays a queue of canned responses and records
//! every submitted request, so pipeline tests can assert on both sides of
//! the wire without a live endpoint.

use core::time::Duration;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::the_module;
use the_module::
{
  Config, HttpRequest, HttpResponse, Transport, TransportError, TransportErrorKind, Value,
  CONTENT_TYPE_TRANSIT_MSGPACK,
};

/// A transport that replays scripted outcomes in order. Submitting past
/// the end of the script fails the request with a distinctive error, so a
/// test that over-submits cannot pass by accident.
#[ derive( Debug, Default ) ]
pub struct ScriptedTransport
{
  responses : Mutex< VecDeque< Result< HttpResponse, TransportError > > >,
  requests : Mutex< Vec< HttpRequest > >,
  timeouts : Mutex< Vec< u64 > >,
}

impl ScriptedTransport
{
  pub fn new() -> Self
  {
    Self::default()
  }

  /// Append a response with the given status and marshalled body.
  pub fn push_body( &self, status : u16, body : &Value )
  {
    let marshalled = the_module::marshal( body ).expect( "test body marshals" );
    let response = HttpResponse
    {
      status,
      content_type : Some( CONTENT_TYPE_TRANSIT_MSGPACK.to_string() ),
      body : Bytes::from( marshalled.bytes ),
    };
    self.responses.lock().unwrap().push_back( Ok( response ) );
  }

  /// Append a bodyless response with the given status.
  pub fn push_status( &self, status : u16 )
  {
    let response = HttpResponse { status, content_type : None, body : Bytes::new() };
    self.responses.lock().unwrap().push_back( Ok( response ) );
  }

  /// Append a transport-level failure.
  pub fn push_error( &self, kind : TransportErrorKind )
  {
    self
      .responses
      .lock()
      .unwrap()
      .push_back( Err( TransportError::new( kind ).with_message( "scripted failure" ) ) );
  }

  /// Number of requests submitted so far.
  pub fn submissions( &self ) -> usize
  {
    self.requests.lock().unwrap().len()
  }

  /// The `index`-th submitted request.
  pub fn request( &self, index : usize ) -> HttpRequest
  {
    self.requests.lock().unwrap()[ index ].clone()
  }

  /// The deadline, in milliseconds, the `index`-th submission carried.
  pub fn timeout_msec( &self, index : usize ) -> u64
  {
    self.timeouts.lock().unwrap()[ index ]
  }
}

#[ async_trait ]
impl Transport for ScriptedTransport
{
  async fn submit( &self, request : HttpRequest, timeout : Duration )
    -> Result< HttpResponse, TransportError >
  {
    self.requests.lock().unwrap().push( request );
    self.timeouts.lock().unwrap().push( timeout.as_millis() as u64 );
    self
      .responses
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else( || Err
      (
        TransportError::new( TransportErrorKind::Other ).with_message( "script exhausted" ),
      ) )
  }
}

/// A complete configuration whose endpoint embeds `marker`, so concurrent
/// tests never collide in the process-wide cache.
pub fn test_config( marker : &str ) -> Config
{
  Config::new()
    .with_account_id( "test-account" )
    .with_access_key( "test-access-key" )
    .with_secret( "test-secret" )
    .with_endpoint( format!( "{marker}.test.example:8998" ) )
    .with_service( "peer-server" )
    .with_region( "none" )
    .with_db_name( "movies" )
}

/// Decode a recorded request's body back into the value space.
pub fn decode_body( request : &HttpRequest ) -> Value
{
  the_module::unmarshal( &request.body, the_module::Format::MsgPack ).expect( "request body decodes" )
}
