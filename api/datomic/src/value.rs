//! Native value space for request payloads and decoded responses.
//!
//! [`Value`] is the dynamic half of the API : request payloads are built as
//! value mappings, responses decode into them, and the typed operation
//! structs pass unrecognized fields through untouched. The type carries a
//! total order so that numeric representations normalize under comparison
//! (`5` and `5.0` are the same value), which the fact tuple's `v` field
//! relies on.

mod private
{
  use core::cmp::Ordering;
  use core::fmt;
  use core::hash::{ Hash, Hasher };
  use std::collections::BTreeMap;

  use crate::Datom;

  /// An interned-style symbolic identifier, `:namespace/name` or `:name`.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::Keyword;
  ///
  /// let k = Keyword::parse( ":person/name" );
  /// assert_eq!( k.namespace(), Some( "person" ) );
  /// assert_eq!( k.name(), "name" );
  /// assert_eq!( k.to_string(), ":person/name" );
  /// ```
  #[ derive( Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash ) ]
  pub struct Keyword
  {
    namespace : Option< String >,
    name : String,
  }

  impl Keyword
  {
    /// Create an unqualified keyword.
    #[ must_use ]
    pub fn new( name : impl Into< String > ) -> Self
    {
      Self { namespace : None, name : name.into() }
    }

    /// Create a namespace-qualified keyword.
    #[ must_use ]
    pub fn namespaced( namespace : impl Into< String >, name : impl Into< String > ) -> Self
    {
      Self { namespace : Some( namespace.into() ), name : name.into() }
    }

    /// Parse `name`, `ns/name`, `:name` or `:ns/name`.
    #[ must_use ]
    pub fn parse( text : &str ) -> Self
    {
      let text = text.strip_prefix( ':' ).unwrap_or( text );
      match text.split_once( '/' )
      {
        Some( ( ns, name ) ) if !ns.is_empty() => Self::namespaced( ns, name ),
        _ => Self::new( text ),
      }
    }

    /// The namespace part, if any.
    #[ must_use ]
    pub fn namespace( &self ) -> Option< &str >
    {
      self.namespace.as_deref()
    }

    /// The name part.
    #[ must_use ]
    pub fn name( &self ) -> &str
    {
      &self.name
    }

    /// `ns/name` without the leading colon, or just `name`.
    #[ must_use ]
    pub fn qualified( &self ) -> String
    {
      match &self.namespace
      {
        Some( ns ) => format!( "{ns}/{}", self.name ),
        None => self.name.clone(),
      }
    }
  }

  impl fmt::Display for Keyword
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      write!( f, ":{}", self.qualified() )
    }
  }

  /// A dynamically typed value.
  ///
  /// The closed set of shapes that cross the codec boundary. Maps are
  /// ordered so marshalling is deterministic and values can key other maps.
  #[ derive( Debug, Clone ) ]
  pub enum Value
  {
    /// Absent value.
    Nil,
    /// Boolean.
    Bool( bool ),
    /// Signed integer.
    Int( i64 ),
    /// Double-precision float.
    Float( f64 ),
    /// Text.
    Str( String ),
    /// Symbolic identifier.
    Keyword( Keyword ),
    /// Universally unique identifier.
    Uuid( uuid::Uuid ),
    /// Opaque byte string.
    Bytes( Vec< u8 > ),
    /// Ordered sequence.
    Vector( Vec< Value > ),
    /// Ordered mapping.
    Map( BTreeMap< Value, Value > ),
    /// A fact tuple reconstructed by the codec's `datom` read handler.
    Datom( Box< Datom > ),
  }

  impl Value
  {
    /// Keyword value from textual form.
    #[ must_use ]
    pub fn kw( text : &str ) -> Self
    {
      Self::Keyword( Keyword::parse( text ) )
    }

    /// Empty mapping.
    #[ must_use ]
    pub fn empty_map() -> Self
    {
      Self::Map( BTreeMap::new() )
    }

    /// Mapping with keyword keys from `( name, value )` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use api_datomic::Value;
    ///
    /// let m = Value::record( [ ( "t", Value::Int( 7 ) ) ] );
    /// assert_eq!( m.get( "t" ), Some( &Value::Int( 7 ) ) );
    /// ```
    #[ must_use ]
    pub fn record< I >( pairs : I ) -> Self
    where
      I : IntoIterator< Item = ( &'static str, Value ) >,
    {
      let mut map = BTreeMap::new();
      for ( name, value ) in pairs
      {
        map.insert( Self::kw( name ), value );
      }
      Self::Map( map )
    }

    /// Field lookup on a mapping, by keyword (qualified name) or string key.
    #[ must_use ]
    pub fn get( &self, key : &str ) -> Option< &Value >
    {
      let Self::Map( map ) = self else { return None };
      map
        .get( &Self::Keyword( Keyword::parse( key ) ) )
        .or_else( || map.get( &Self::Str( key.to_string() ) ) )
    }

    /// Associate a keyword field on a mapping. `Nil` promotes to a fresh mapping.
    #[ must_use ]
    pub fn assoc( self, key : &str, value : Value ) -> Self
    {
      let mut map = match self
      {
        Self::Map( map ) => map,
        Self::Nil => BTreeMap::new(),
        other => return other,
      };
      map.insert( Self::kw( key ), value );
      Self::Map( map )
    }

    /// Merge another mapping's entries over this mapping's.
    #[ must_use ]
    pub fn merge( self, other : Value ) -> Self
    {
      match ( self, other )
      {
        ( Self::Map( mut left ), Self::Map( right ) ) =>
        {
          left.extend( right );
          Self::Map( left )
        }
        ( left, Self::Nil ) => left,
        ( _, right ) => right,
      }
    }

    /// True for `Nil`.
    #[ must_use ]
    pub fn is_nil( &self ) -> bool
    {
      matches!( self, Self::Nil )
    }

    /// Borrow as text.
    #[ must_use ]
    pub fn as_str( &self ) -> Option< &str >
    {
      match self
      {
        Self::Str( s ) => Some( s ),
        _ => None,
      }
    }

    /// Narrow to an integer.
    #[ must_use ]
    pub fn as_i64( &self ) -> Option< i64 >
    {
      match self
      {
        Self::Int( i ) => Some( *i ),
        _ => None,
      }
    }

    /// Narrow to a non-negative integer.
    #[ must_use ]
    pub fn as_u64( &self ) -> Option< u64 >
    {
      match self
      {
        Self::Int( i ) if *i >= 0 => Some( *i as u64 ),
        _ => None,
      }
    }

    /// Narrow to a boolean.
    #[ must_use ]
    pub fn as_bool( &self ) -> Option< bool >
    {
      match self
      {
        Self::Bool( b ) => Some( *b ),
        _ => None,
      }
    }

    /// Borrow as a sequence.
    #[ must_use ]
    pub fn as_vec( &self ) -> Option< &Vec< Value > >
    {
      match self
      {
        Self::Vector( v ) => Some( v ),
        _ => None,
      }
    }

    /// Borrow as a mapping.
    #[ must_use ]
    pub fn as_map( &self ) -> Option< &BTreeMap< Value, Value > >
    {
      match self
      {
        Self::Map( m ) => Some( m ),
        _ => None,
      }
    }

    /// Borrow as a keyword.
    #[ must_use ]
    pub fn as_keyword( &self ) -> Option< &Keyword >
    {
      match self
      {
        Self::Keyword( k ) => Some( k ),
        _ => None,
      }
    }

    fn rank( &self ) -> u8
    {
      match self
      {
        Self::Nil => 0,
        Self::Bool( _ ) => 1,
        Self::Int( _ ) | Self::Float( _ ) => 2,
        Self::Str( _ ) => 3,
        Self::Keyword( _ ) => 4,
        Self::Uuid( _ ) => 5,
        Self::Bytes( _ ) => 6,
        Self::Vector( _ ) => 7,
        Self::Map( _ ) => 8,
        Self::Datom( _ ) => 9,
      }
    }
  }

  impl PartialEq for Value
  {
    fn eq( &self, other : &Self ) -> bool
    {
      self.cmp( other ) == Ordering::Equal
    }
  }

  impl Eq for Value {}

  impl PartialOrd for Value
  {
    fn partial_cmp( &self, other : &Self ) -> Option< Ordering >
    {
      Some( self.cmp( other ) )
    }
  }

  impl Ord for Value
  {
    /// Total order over all values. Numbers order by numeric value across
    /// representations, everything else orders within its own shape, and
    /// shapes order by a fixed rank.
    fn cmp( &self, other : &Self ) -> Ordering
    {
      match ( self, other )
      {
        ( Self::Int( a ), Self::Int( b ) ) => a.cmp( b ),
        ( Self::Float( a ), Self::Float( b ) ) => a.total_cmp( b ),
        ( Self::Int( a ), Self::Float( b ) ) => ( *a as f64 ).total_cmp( b ),
        ( Self::Float( a ), Self::Int( b ) ) => a.total_cmp( &( *b as f64 ) ),
        ( Self::Bool( a ), Self::Bool( b ) ) => a.cmp( b ),
        ( Self::Str( a ), Self::Str( b ) ) => a.cmp( b ),
        ( Self::Keyword( a ), Self::Keyword( b ) ) => a.cmp( b ),
        ( Self::Uuid( a ), Self::Uuid( b ) ) => a.cmp( b ),
        ( Self::Bytes( a ), Self::Bytes( b ) ) => a.cmp( b ),
        ( Self::Vector( a ), Self::Vector( b ) ) => a.cmp( b ),
        ( Self::Map( a ), Self::Map( b ) ) => a.cmp( b ),
        ( Self::Datom( a ), Self::Datom( b ) ) => a.cmp( b ),
        ( a, b ) => a.rank().cmp( &b.rank() ),
      }
    }
  }

  impl Hash for Value
  {
    fn hash< H : Hasher >( &self, state : &mut H )
    {
      match self
      {
        Self::Nil => state.write_u8( 0 ),
        Self::Bool( b ) =>
        {
          state.write_u8( 1 );
          b.hash( state );
        }
        // Integers and integral floats must hash alike : they are equal.
        Self::Int( i ) =>
        {
          state.write_u8( 2 );
          state.write_i64( *i );
        }
        Self::Float( f ) =>
        {
          if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64
          {
            state.write_u8( 2 );
            state.write_i64( *f as i64 );
          }
          else
          {
            state.write_u8( 3 );
            state.write_u64( f.to_bits() );
          }
        }
        Self::Str( s ) =>
        {
          state.write_u8( 4 );
          s.hash( state );
        }
        Self::Keyword( k ) =>
        {
          state.write_u8( 5 );
          k.hash( state );
        }
        Self::Uuid( u ) =>
        {
          state.write_u8( 6 );
          u.hash( state );
        }
        Self::Bytes( b ) =>
        {
          state.write_u8( 7 );
          b.hash( state );
        }
        Self::Vector( v ) =>
        {
          state.write_u8( 8 );
          v.hash( state );
        }
        Self::Map( m ) =>
        {
          state.write_u8( 9 );
          m.hash( state );
        }
        Self::Datom( d ) =>
        {
          state.write_u8( 10 );
          d.hash( state );
        }
      }
    }
  }

  impl fmt::Display for Value
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      match self
      {
        Self::Nil => f.write_str( "nil" ),
        Self::Bool( b ) => write!( f, "{b}" ),
        Self::Int( i ) => write!( f, "{i}" ),
        Self::Float( x ) => write!( f, "{x:?}" ),
        Self::Str( s ) => write!( f, "{s:?}" ),
        Self::Keyword( k ) => write!( f, "{k}" ),
        Self::Uuid( u ) => write!( f, "#uuid \"{u}\"" ),
        Self::Bytes( b ) => write!( f, "#bytes[{}]", b.len() ),
        Self::Vector( items ) =>
        {
          f.write_str( "[" )?;
          for ( i, item ) in items.iter().enumerate()
          {
            if i > 0
            {
              f.write_str( " " )?;
            }
            write!( f, "{item}" )?;
          }
          f.write_str( "]" )
        }
        Self::Map( map ) =>
        {
          f.write_str( "{" )?;
          for ( i, ( k, v ) ) in map.iter().enumerate()
          {
            if i > 0
            {
              f.write_str( ", " )?;
            }
            write!( f, "{k} {v}" )?;
          }
          f.write_str( "}" )
        }
        Self::Datom( d ) => write!( f, "{d}" ),
      }
    }
  }

  impl Default for Value
  {
    fn default() -> Self
    {
      Self::Nil
    }
  }

  impl From< bool > for Value
  {
    fn from( b : bool ) -> Self
    {
      Self::Bool( b )
    }
  }

  impl From< i64 > for Value
  {
    fn from( i : i64 ) -> Self
    {
      Self::Int( i )
    }
  }

  impl From< u64 > for Value
  {
    fn from( i : u64 ) -> Self
    {
      Self::Int( i as i64 )
    }
  }

  impl From< f64 > for Value
  {
    fn from( x : f64 ) -> Self
    {
      Self::Float( x )
    }
  }

  impl From< &str > for Value
  {
    fn from( s : &str ) -> Self
    {
      Self::Str( s.to_string() )
    }
  }

  impl From< String > for Value
  {
    fn from( s : String ) -> Self
    {
      Self::Str( s )
    }
  }

  impl From< Keyword > for Value
  {
    fn from( k : Keyword ) -> Self
    {
      Self::Keyword( k )
    }
  }

  impl From< uuid::Uuid > for Value
  {
    fn from( u : uuid::Uuid ) -> Self
    {
      Self::Uuid( u )
    }
  }

  impl From< Vec< Value > > for Value
  {
    fn from( v : Vec< Value > ) -> Self
    {
      Self::Vector( v )
    }
  }

  impl From< Datom > for Value
  {
    fn from( d : Datom ) -> Self
    {
      Self::Datom( Box::new( d ) )
    }
  }
}

crate::mod_interface!
{
  exposed use Keyword;
  exposed use Value;
}
