//! Codec boundary tests : round-trips, the datom read handler, and
//! content-type dispatch.

#[ allow( unused_imports ) ]
use super::*;
use the_module::
{
  Category, Datom, Format, Value,
  marshal, read_edn, unmarshal, unmarshal_content,
  CONTENT_TYPE_EDN, CONTENT_TYPE_TEXT, CONTENT_TYPE_TRANSIT_JSON, CONTENT_TYPE_TRANSIT_MSGPACK,
};

fn composite() -> Value
{
  Value::record
  (
    [
      ( "nil", Value::Nil ),
      ( "flag", Value::Bool( true ) ),
      ( "count", Value::Int( -7 ) ),
      ( "ratio", Value::Float( 2.5 ) ),
      ( "name", Value::from( "Ada" ) ),
      ( "ident", Value::kw( ":person/name" ) ),
      ( "id", Value::Uuid( "3b5a6a6e-0c2b-4d3f-9b6a-0f2b4d3f9b6a".parse().unwrap() ) ),
      ( "raw", Value::Bytes( vec![ 0, 1, 2, 255 ] ) ),
      ( "items", Value::Vector( vec![ Value::Int( 1 ), Value::from( "two" ) ] ) ),
      (
        "nested",
        Value::record( [ ( "inner", Value::kw( ":k" ) ) ] ),
      ),
      (
        "fact",
        Value::Datom( Box::new( Datom::new( Value::Int( 1 ), Value::kw( ":a" ), Value::from( "v" ), 10, true ) ) ),
      ),
    ]
  )
}

#[ test ]
fn msgpack_round_trip_preserves_every_shape()
{
  let original = composite();
  let marshalled = marshal( &original ).expect( "marshals" );
  assert_eq!( marshalled.length, marshalled.bytes.len() );
  let decoded = unmarshal( marshalled.payload(), Format::MsgPack ).expect( "unmarshals" );
  assert_eq!( decoded, original );
}

#[ test ]
fn tilde_strings_survive_the_escape()
{
  let original = Value::record
  (
    [
      ( "twiddle", Value::from( "~looks-tagged" ) ),
      ( "kw-like", Value::from( "~:not-a-keyword" ) ),
    ]
  );
  let marshalled = marshal( &original ).expect( "marshals" );
  let decoded = unmarshal( marshalled.payload(), Format::MsgPack ).expect( "unmarshals" );
  assert_eq!( decoded, original );
  assert_eq!( decoded.get( "kw-like" ), Some( &Value::from( "~:not-a-keyword" ) ) );
}

#[ test ]
fn datom_read_handler_reconstructs_fact_tuples()
{
  // A tagged 5-element sequence arriving from the wire becomes a Datom.
  let wire = Value::record
  (
    [
      (
        "data",
        Value::Vector( vec![ Value::Datom
        (
          Box::new( Datom::new( Value::Int( 17 ), Value::kw( ":person/name" ), Value::from( "Ada" ), 1000, true ) ),
        ) ] ),
      ),
    ]
  );
  let marshalled = marshal( &wire ).expect( "marshals" );
  let decoded = unmarshal( marshalled.payload(), Format::MsgPack ).expect( "unmarshals" );
  let data = decoded.get( "data" ).and_then( Value::as_vec ).expect( "data vector" );
  match &data[ 0 ]
  {
    Value::Datom( datom ) =>
    {
      assert_eq!( datom.e(), &Value::Int( 17 ) );
      assert_eq!( datom.t(), 1000 );
      assert!( datom.added() );
    }
    other => panic!( "expected a datom, got {other}" ),
  }
}

#[ test ]
fn json_bodies_decode_with_the_same_handlers()
{
  let text = r#"{ "~:t" : 7, "~:ident" : "~:person/name", "plain" : [ 1, 2.5, null, true ] }"#;
  let decoded = unmarshal( text.as_bytes(), Format::Json ).expect( "json decodes" );
  assert_eq!( decoded.get( "t" ), Some( &Value::Int( 7 ) ) );
  assert_eq!( decoded.get( "ident" ), Some( &Value::kw( ":person/name" ) ) );
  let plain = decoded.get( "plain" ).and_then( Value::as_vec ).expect( "vector" );
  assert_eq!( plain[ 2 ], Value::Nil );
}

#[ test ]
fn content_type_dispatch_covers_the_table()
{
  let body = Value::record( [ ( "t", Value::Int( 1 ) ) ] );
  let marshalled = marshal( &body ).expect( "marshals" );
  assert_eq!
  (
    unmarshal_content( marshalled.payload(), CONTENT_TYPE_TRANSIT_MSGPACK ).expect( "msgpack" ),
    body,
  );
  assert_eq!
  (
    unmarshal_content( br#"{ "~:t" : 1 }"#, CONTENT_TYPE_TRANSIT_JSON ).expect( "json" ),
    body,
  );
  assert_eq!
  (
    unmarshal_content( b"{:t 1}", CONTENT_TYPE_EDN ).expect( "edn" ),
    body,
  );
  assert_eq!
  (
    unmarshal_content( b"plain words", CONTENT_TYPE_TEXT ).expect( "text" ),
    Value::from( "plain words" ),
  );

  // Charset parameters do not defeat the dispatch.
  assert_eq!
  (
    unmarshal_content( b"plain words", "text/plain; charset=utf-8" ).expect( "text" ),
    Value::from( "plain words" ),
  );
}

#[ test ]
fn unknown_content_type_is_a_fault()
{
  let anomaly = unmarshal_content( b"<html/>", "text/html" ).expect_err( "must fail" );
  assert_eq!( anomaly.category(), Category::Fault );
  assert!( anomaly.message().unwrap().contains( "Cannot unmarshal content-type text/html" ) );
}

#[ test ]
fn edn_reader_covers_atoms_collections_and_tags()
{
  let text = r#"{:status "ok"
                 :points [1 2.5 -3]
                 :flags (true false nil)
                 :id #uuid "3b5a6a6e-0c2b-4d3f-9b6a-0f2b4d3f9b6a"
                 :fact #datom [1 :a "v" 10 true]}"#;
  let decoded = read_edn( text ).expect( "edn decodes" );
  assert_eq!( decoded.get( "status" ), Some( &Value::from( "ok" ) ) );
  let points = decoded.get( "points" ).and_then( Value::as_vec ).expect( "points" );
  assert_eq!( points[ 2 ], Value::Int( -3 ) );
  let flags = decoded.get( "flags" ).and_then( Value::as_vec ).expect( "flags" );
  assert_eq!( flags[ 2 ], Value::Nil );
  assert!( matches!( decoded.get( "id" ), Some( Value::Uuid( _ ) ) ) );
  match decoded.get( "fact" )
  {
    Some( Value::Datom( datom ) ) => assert_eq!( datom.t(), 10 ),
    other => panic!( "expected a datom, got {other:?}" ),
  }
}

#[ test ]
fn edn_reader_rejects_garbage()
{
  assert!( read_edn( "{:unterminated" ).is_err() );
  assert!( read_edn( "\"unterminated" ).is_err() );
  assert!( read_edn( "" ).is_err() );
}
