//! Fact tuple tests : positional and keyed access, equality, hashing,
//! and the print form.

#[ allow( unused_imports ) ]
use super::*;
use std::collections::HashSet;

use the_module::{ Datom, Value };

fn sample( v : Value, t : i64 ) -> Datom
{
  Datom::new( Value::Int( 42 ), Value::kw( ":person/age" ), v, t, true )
}

#[ test ]
fn positional_access_yields_fields_in_order()
{
  let datom = sample( Value::Int( 30 ), 1000 );
  assert_eq!( datom[ 0 ], Value::Int( 42 ) );
  assert_eq!( datom[ 1 ], Value::kw( ":person/age" ) );
  assert_eq!( datom[ 2 ], Value::Int( 30 ) );
  assert_eq!( datom[ 3 ], Value::Int( 1000 ) );
  assert_eq!( datom[ 4 ], Value::Bool( true ) );
}

#[ test ]
#[ should_panic( expected = "out of bounds" ) ]
fn positional_access_past_the_tuple_panics()
{
  let datom = sample( Value::Int( 30 ), 1000 );
  let _ = &datom[ 5 ];
}

#[ test ]
fn keyed_access_by_field_name()
{
  let datom = sample( Value::Int( 30 ), 1000 );
  assert_eq!( datom.field( "e" ), Some( &Value::Int( 42 ) ) );
  assert_eq!( datom.field( "v" ), Some( &Value::Int( 30 ) ) );
  assert_eq!( datom.field( "added" ), Some( &Value::Bool( true ) ) );
  assert_eq!( datom.field( "elsewhere" ), None );
}

#[ test ]
fn equality_is_fieldwise_and_normalizes_v()
{
  // v compares by the value space's total order, so 30 and 30.0 coincide.
  assert_eq!( sample( Value::Int( 30 ), 1000 ), sample( Value::Float( 30.0 ), 1000 ) );
  assert_ne!( sample( Value::Int( 30 ), 1000 ), sample( Value::Int( 31 ), 1000 ) );
}

#[ test ]
fn equality_includes_t_but_hash_ignores_it()
{
  let early = sample( Value::Int( 30 ), 1000 );
  let late = sample( Value::Int( 30 ), 2000 );
  assert_ne!( early, late );

  // Same fact at two points in time : two set members, hashing to the
  // same bucket by design.
  let mut seen = HashSet::new();
  seen.insert( early.clone() );
  seen.insert( late.clone() );
  assert_eq!( seen.len(), 2 );
  assert!( seen.contains( &early ) );
  assert!( seen.contains( &late ) );
}

#[ test ]
fn print_form_is_tagged_and_positional()
{
  let datom = Datom::new
  (
    Value::Int( 42 ),
    Value::kw( ":person/name" ),
    Value::from( "Ada" ),
    1000,
    false,
  );
  assert_eq!( datom.to_string(), "#datom[42 :person/name \"Ada\" 1000 false]" );
}

#[ test ]
fn from_seq_requires_the_exact_shape()
{
  let fields = vec!
  [
    Value::Int( 1 ),
    Value::kw( ":a" ),
    Value::from( "v" ),
    Value::Int( 10 ),
    Value::Bool( true ),
  ];
  let datom = Datom::from_seq( &fields ).expect( "well-formed tuple" );
  assert_eq!( datom.t(), 10 );
  assert!( datom.added() );

  assert!( Datom::from_seq( &fields[ ..4 ] ).is_none() );
  let mut wrong = fields.clone();
  wrong[ 4 ] = Value::Int( 1 );
  assert!( Datom::from_seq( &wrong ).is_none() );
}
