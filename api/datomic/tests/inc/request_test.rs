//! Request construction tests : qualified ops, the header invariants, and
//! the signed envelope.

#[ allow( unused_imports ) ]
use super::*;
use the_module::
{
  build_request, marshal, sign_at, Endpoint, HttpRequest, Op, SigningParams, Value,
  CONTENT_TYPE_TRANSIT_MSGPACK, HEADER_NEXT, HEADER_OP, HEADER_TARGET,
};

fn endpoint() -> Endpoint
{
  Endpoint { scheme : "https".to_string(), host : "db.example.com".to_string(), port : 8998 }
}

fn signing() -> SigningParams
{
  SigningParams
  {
    access_key : "AK".to_string(),
    secret : "SK".to_string(),
    service : "peer-server".to_string(),
    region : "none".to_string(),
  }
}

fn payload() -> the_module::Marshalled
{
  marshal( &Value::record( [ ( "db-name", Value::from( "movies" ) ) ] ) ).expect( "marshals" )
}

#[ test ]
fn qualified_ops_split_by_namespace()
{
  assert_eq!( Op::Status.qualified(), "datomic.client.protocol/status" );
  assert_eq!( Op::IndexRange.qualified(), "datomic.client.protocol/index-range" );
  assert_eq!( Op::Next.qualified(), "datomic.client.protocol/next" );
  assert_eq!( Op::ResolveDb.qualified(), "datomic.catalog/resolve-db" );
  assert_eq!( Op::ListDbs.qualified(), "datomic.catalog/list-dbs" );
  assert!( Op::DeleteDb.is_catalog() );
  assert!( !Op::Transact.is_catalog() );
}

#[ test ]
fn non_catalog_requests_target_their_database()
{
  let request = build_request( &endpoint(), Some( "db-7" ), Op::Datoms, None, &payload(), &signing() );
  assert_eq!( request.header( "host" ), Some( "db.example.com" ) );
  assert_eq!( request.header( "content-type" ), Some( CONTENT_TYPE_TRANSIT_MSGPACK ) );
  assert_eq!( request.header( "accept" ), Some( CONTENT_TYPE_TRANSIT_MSGPACK ) );
  assert_eq!( request.header( HEADER_OP ), Some( "datomic.client.protocol/datoms" ) );
  assert_eq!( request.header( HEADER_TARGET ), Some( "db-7" ) );
  assert_eq!( request.header( HEADER_NEXT ), None );
}

#[ test ]
fn catalog_requests_never_carry_a_target()
{
  let request = build_request( &endpoint(), Some( "db-7" ), Op::ResolveDb, None, &payload(), &signing() );
  assert_eq!( request.header( HEADER_OP ), Some( "datomic.catalog/resolve-db" ) );
  assert_eq!( request.header( HEADER_TARGET ), None );
}

#[ test ]
fn the_continuation_header_appears_iff_a_token_rides_along()
{
  let without = build_request( &endpoint(), Some( "db-7" ), Op::Next, None, &payload(), &signing() );
  assert_eq!( without.header( HEADER_NEXT ), None );

  let with = build_request( &endpoint(), Some( "db-7" ), Op::Next, Some( "tok-3" ), &payload(), &signing() );
  assert_eq!( with.header( HEADER_NEXT ), Some( "tok-3" ) );
}

#[ test ]
fn the_body_is_exactly_the_marshalled_length()
{
  let mut marshalled = payload();
  let length = marshalled.length;
  // Arena reuse : the buffer may be longer than the payload.
  marshalled.bytes.extend_from_slice( &[ 0xAA, 0xBB, 0xCC ] );
  let request = build_request( &endpoint(), None, Op::ListDbs, None, &marshalled, &signing() );
  assert_eq!( request.body.len(), length );
  assert_eq!( &request.body[ .. ], marshalled.payload() );
}

#[ test ]
fn requests_leave_the_builder_signed()
{
  let request = build_request( &endpoint(), Some( "db-7" ), Op::Q, None, &payload(), &signing() );
  assert!( request.header( "x-amz-date" ).is_some() );
  let authorization = request.header( "authorization" ).expect( "signed" );
  assert!( authorization.contains( "Credential=AK/" ) );
  assert!( authorization.contains( "Signature=" ) );
}

#[ test ]
fn signing_is_deterministic_at_a_fixed_instant()
{
  let when = chrono_instant();
  let mut first = HttpRequest::new( "https", "db.example.com", 8998 );
  first.body = bytes::Bytes::from_static( b"payload" );
  let mut second = first.clone();
  sign_at( &mut first, &signing(), when );
  sign_at( &mut second, &signing(), when );
  assert_eq!( first.header( "authorization" ), second.header( "authorization" ) );

  // A different secret signs differently.
  let mut other = HttpRequest::new( "https", "db.example.com", 8998 );
  other.body = bytes::Bytes::from_static( b"payload" );
  let mut params = signing();
  params.secret = "ANOTHER".to_string();
  sign_at( &mut other, &params, when );
  assert_ne!( first.header( "authorization" ), other.header( "authorization" ) );
}

fn chrono_instant() -> chrono::DateTime< chrono::Utc >
{
  use chrono::TimeZone as _;
  chrono::Utc.with_ymd_and_hms( 2024, 5, 17, 12, 0, 0 ).unwrap()
}
