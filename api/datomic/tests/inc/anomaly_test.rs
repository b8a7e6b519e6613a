//! Anomaly model tests : the closed category set, body extraction, and
//! the error predicate.

#[ allow( unused_imports ) ]
use super::*;
use the_module::{ Anomaly, Category, Value };

#[ test ]
fn category_parse_accepts_every_spelling()
{
  let cases =
  [
    ( "incorrect", Category::Incorrect ),
    ( "forbidden", Category::Forbidden ),
    ( "busy", Category::Busy ),
    ( "unavailable", Category::Unavailable ),
    ( "not-found", Category::NotFound ),
    ( "interrupted", Category::Interrupted ),
    ( "fault", Category::Fault ),
  ];
  for ( tag, expected ) in cases
  {
    assert_eq!( Category::parse( tag ), Some( expected ), "bare {tag}" );
    assert_eq!( Category::parse( &format!( ":{tag}" ) ), Some( expected ), "colon {tag}" );
    assert_eq!
    (
      Category::parse( &format!( "cognitect.anomalies/{tag}" ) ),
      Some( expected ),
      "qualified {tag}",
    );
  }
  assert_eq!( Category::parse( "surprising" ), None );
}

#[ test ]
fn category_parse_accepts_historical_misspelling()
{
  // Older peers emit `unvailable`; it reads as `unavailable` but is never
  // written back.
  assert_eq!( Category::parse( "unvailable" ), Some( Category::Unavailable ) );
  assert_eq!( Category::parse( ":cognitect.anomalies/unvailable" ), Some( Category::Unavailable ) );
  assert_eq!( Category::Unavailable.as_str(), "unavailable" );
}

#[ test ]
fn from_body_extracts_category_and_message()
{
  let body = Value::record
  (
    [
      ( "cognitect.anomalies/category", Value::kw( ":cognitect.anomalies/busy" ) ),
      ( "cognitect.anomalies/message", Value::from( "throttled back" ) ),
    ]
  );
  let anomaly = Anomaly::from_body( &body ).expect( "body carries an anomaly" );
  assert_eq!( anomaly.category(), Category::Busy );
  assert_eq!( anomaly.message(), Some( "throttled back" ) );
  assert!( anomaly.is_busy() );
}

#[ test ]
fn error_predicate_requires_a_category_field()
{
  let plain = Value::record( [ ( "result", Value::Int( 1 ) ) ] );
  assert!( !Anomaly::is_anomalous( &plain ) );
  assert!( !Anomaly::is_anomalous( &Value::Nil ) );

  let tagged = Value::record
  (
    [ ( "cognitect.anomalies/category", Value::kw( ":cognitect.anomalies/fault" ) ) ]
  );
  assert!( Anomaly::is_anomalous( &tagged ) );

  // An unrecognized tag is not an anomaly.
  let unknown = Value::record
  (
    [ ( "cognitect.anomalies/category", Value::kw( ":cognitect.anomalies/sideways" ) ) ]
  );
  assert!( !Anomaly::is_anomalous( &unknown ) );
}

#[ test ]
fn display_includes_category_and_message()
{
  let anomaly = Anomaly::new( Category::Interrupted ).with_message( "deadline expired".to_string() );
  let text = anomaly.to_string();
  assert!( text.contains( "interrupted" ) );
  assert!( text.contains( "deadline expired" ) );
}
