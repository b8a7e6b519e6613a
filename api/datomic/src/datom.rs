//! The fact tuple : `( e, a, v, t, added )`.

mod private
{
  use core::cmp::Ordering;
  use core::fmt;
  use core::hash::{ Hash, Hasher };
  use core::ops::Index;

  use crate::Value;

  /// One fact : entity, attribute, value, transaction point, assertion flag.
  ///
  /// Supports positional access 0..4 and keyed access by field name. The
  /// `v` field compares by the value space's total order, so numeric
  /// representations normalize. The hash deliberately ignores `t` while
  /// equality includes it : `t` separates otherwise-identical facts across
  /// time.
  ///
  /// # Examples
  ///
  /// ```
  /// use api_datomic::{ Datom, Value };
  ///
  /// let datom = Datom::new( Value::Int( 42 ), Value::kw( ":person/name" ), Value::from( "Ada" ), 1000, true );
  /// assert_eq!( datom[ 0 ], Value::Int( 42 ) );
  /// assert_eq!( datom.t(), 1000 );
  /// assert_eq!( datom.to_string(), "#datom[42 :person/name \"Ada\" 1000 true]" );
  /// ```
  #[ derive( Debug, Clone ) ]
  pub struct Datom
  {
    e : Value,
    a : Value,
    v : Value,
    t : Value,
    added : Value,
  }

  impl Datom
  {
    /// Create a fact tuple.
    #[ must_use ]
    pub fn new( e : Value, a : Value, v : Value, t : i64, added : bool ) -> Self
    {
      Self
      {
        e,
        a,
        v,
        t : Value::Int( t ),
        added : Value::Bool( added ),
      }
    }

    /// Reconstruct from a decoded 5-element sequence, the codec's `datom`
    /// read handler. Returns `None` when the shape does not match.
    #[ must_use ]
    pub fn from_seq( fields : &[ Value ] ) -> Option< Self >
    {
      match fields
      {
        [ e, a, v, t, added ] =>
        {
          let t = t.as_i64()?;
          let added = added.as_bool()?;
          Some( Self::new( e.clone(), a.clone(), v.clone(), t, added ) )
        }
        _ => None,
      }
    }

    /// The tuple as a 5-element sequence, for marshalling.
    #[ must_use ]
    pub fn to_seq( &self ) -> Vec< Value >
    {
      vec!
      [
        self.e.clone(),
        self.a.clone(),
        self.v.clone(),
        self.t.clone(),
        self.added.clone(),
      ]
    }

    /// Entity.
    #[ must_use ]
    pub fn e( &self ) -> &Value
    {
      &self.e
    }

    /// Attribute.
    #[ must_use ]
    pub fn a( &self ) -> &Value
    {
      &self.a
    }

    /// Value.
    #[ must_use ]
    pub fn v( &self ) -> &Value
    {
      &self.v
    }

    /// Transaction point.
    ///
    /// # Panics
    ///
    /// Never : the constructor only stores an integer here.
    #[ must_use ]
    pub fn t( &self ) -> i64
    {
      self.t.as_i64().expect( "t is an integer by construction" )
    }

    /// True for an assertion, false for a retraction.
    ///
    /// # Panics
    ///
    /// Never : the constructor only stores a boolean here.
    #[ must_use ]
    pub fn added( &self ) -> bool
    {
      self.added.as_bool().expect( "added is a boolean by construction" )
    }

    /// Keyed access by field name.
    #[ must_use ]
    pub fn field( &self, name : &str ) -> Option< &Value >
    {
      match name
      {
        "e" => Some( &self.e ),
        "a" => Some( &self.a ),
        "v" => Some( &self.v ),
        "t" => Some( &self.t ),
        "added" => Some( &self.added ),
        _ => None,
      }
    }
  }

  impl Index< usize > for Datom
  {
    type Output = Value;

    /// Positional access : `0..4` yield `e, a, v, t, added`.
    ///
    /// # Panics
    ///
    /// Panics when the position is out of bounds.
    fn index( &self, position : usize ) -> &Value
    {
      match position
      {
        0 => &self.e,
        1 => &self.a,
        2 => &self.v,
        3 => &self.t,
        4 => &self.added,
        _ => panic!( "datom position out of bounds : {position}" ),
      }
    }
  }

  impl PartialEq for Datom
  {
    fn eq( &self, other : &Self ) -> bool
    {
      self.cmp( other ) == Ordering::Equal
    }
  }

  impl Eq for Datom {}

  impl PartialOrd for Datom
  {
    fn partial_cmp( &self, other : &Self ) -> Option< Ordering >
    {
      Some( self.cmp( other ) )
    }
  }

  impl Ord for Datom
  {
    fn cmp( &self, other : &Self ) -> Ordering
    {
      self.e
        .cmp( &other.e )
        .then_with( || self.a.cmp( &other.a ) )
        .then_with( || self.v.cmp( &other.v ) )
        .then_with( || self.t.cmp( &other.t ) )
        .then_with( || self.added.cmp( &other.added ) )
    }
  }

  impl Hash for Datom
  {
    // t is excluded on purpose, see the type-level doc.
    fn hash< H : Hasher >( &self, state : &mut H )
    {
      self.e.hash( state );
      self.a.hash( state );
      self.v.hash( state );
      self.added.hash( state );
    }
  }

  impl fmt::Display for Datom
  {
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      write!( f, "#datom[{} {} {} {} {}]", self.e, self.a, self.v, self.t, self.added )
    }
  }
}

crate::mod_interface!
{
  exposed use Datom;
}
