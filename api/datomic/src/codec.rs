//! Codec boundary : marshal/unmarshal between [`Value`] and wire bytes.
//!
//! The wire format is a schema-less tagged binary encoding : msgpack (the
//! default) or json carry plain shapes, with string tags for the richer
//! ones. Keywords travel as `~:name`, uuids as `~u<hex>`, plain strings
//! beginning with `~` gain one more `~`, and fact tuples travel as the
//! tagged sequence `["~#datom" [e a v t added]]`. Reviving those tags on
//! the way in is the read-handler half of the contract; in particular a
//! tagged 5-element sequence is reconstructed as a [`Datom`].

mod private
{
  use serde::de::{ self, Visitor };
  use serde::ser::{ SerializeMap, SerializeSeq };
  use serde::{ Deserialize, Deserializer, Serialize, Serializer };
  use std::collections::BTreeMap;

  use crate::{ Anomaly, Datom, DatomicResult, Keyword, Value };

  /// Content type of every request body and of ordinary response bodies.
  pub const CONTENT_TYPE_TRANSIT_MSGPACK : &str = "application/transit+msgpack";
  /// Textual variant of the wire format.
  pub const CONTENT_TYPE_TRANSIT_JSON : &str = "application/transit+json";
  /// Symbolic-expression bodies, seen on some error responses.
  pub const CONTENT_TYPE_EDN : &str = "application/edn";
  /// Raw text bodies.
  pub const CONTENT_TYPE_TEXT : &str = "text/plain";

  const DATOM_TAG : &str = "~#datom";

  /// Wire format selector for [`unmarshal`].
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum Format
  {
    /// Binary msgpack encoding.
    MsgPack,
    /// Textual json encoding.
    Json,
  }

  /// A marshalled payload. `bytes` may out-live `length` (arena reuse is
  /// permitted); exactly `length` bytes are the payload.
  #[ derive( Debug, Clone ) ]
  pub struct Marshalled
  {
    /// Backing buffer.
    pub bytes : Vec< u8 >,
    /// Number of payload bytes at the front of `bytes`.
    pub length : usize,
  }

  impl Marshalled
  {
    /// The payload slice, exactly `length` bytes.
    #[ must_use ]
    pub fn payload( &self ) -> &[ u8 ]
    {
      &self.bytes[ ..self.length ]
    }
  }

  /// Encode a value as a sized msgpack buffer.
  ///
  /// # Errors
  ///
  /// Returns an `incorrect` anomaly when the value cannot be encoded.
  pub fn marshal( value : &Value ) -> DatomicResult< Marshalled >
  {
    let bytes = rmp_serde::to_vec( value )
      .map_err( | e | Anomaly::incorrect( format!( "Cannot marshal request : {e}" ) ) )?;
    let length = bytes.len();
    Ok( Marshalled { bytes, length } )
  }

  /// Decode bytes of the given format into the native value space,
  /// reviving tagged shapes.
  ///
  /// # Errors
  ///
  /// Returns a `fault` anomaly when the bytes do not decode.
  pub fn unmarshal( bytes : &[ u8 ], format : Format ) -> DatomicResult< Value >
  {
    let raw = match format
    {
      Format::MsgPack => rmp_serde::from_slice::< Value >( bytes )
        .map_err( | e | Anomaly::fault( format!( "Cannot unmarshal msgpack : {e}" ) ) )?,
      Format::Json => serde_json::from_slice::< Value >( bytes )
        .map_err( | e | Anomaly::fault( format!( "Cannot unmarshal json : {e}" ) ) )?,
    };
    Ok( revive( raw ) )
  }

  /// Decode a response body by its content type.
  ///
  /// # Errors
  ///
  /// Returns a `fault` anomaly for undecodable bytes or an unrecognized
  /// content type.
  pub fn unmarshal_content( bytes : &[ u8 ], content_type : &str ) -> DatomicResult< Value >
  {
    let media = content_type.split( ';' ).next().unwrap_or( "" ).trim();
    match media
    {
      CONTENT_TYPE_TRANSIT_MSGPACK => unmarshal( bytes, Format::MsgPack ),
      CONTENT_TYPE_TRANSIT_JSON => unmarshal( bytes, Format::Json ),
      CONTENT_TYPE_EDN =>
      {
        let text = core::str::from_utf8( bytes )
          .map_err( | e | Anomaly::fault( format!( "Cannot unmarshal edn : {e}" ) ) )?;
        read_edn( text )
      }
      CONTENT_TYPE_TEXT => Ok( Value::Str( String::from_utf8_lossy( bytes ).into_owned() ) ),
      other => Err( Anomaly::fault( format!( "Cannot unmarshal content-type {other}" ) ) ),
    }
  }

  // Writes a tag string without the `~`-escaping applied to plain strings.
  struct RawTag( &'static str );

  impl Serialize for RawTag
  {
    fn serialize< S : Serializer >( &self, serializer : S ) -> Result< S::Ok, S::Error >
    {
      serializer.serialize_str( self.0 )
    }
  }

  impl Serialize for Value
  {
    fn serialize< S : Serializer >( &self, serializer : S ) -> Result< S::Ok, S::Error >
    {
      match self
      {
        Value::Nil => serializer.serialize_unit(),
        Value::Bool( b ) => serializer.serialize_bool( *b ),
        Value::Int( i ) => serializer.serialize_i64( *i ),
        Value::Float( x ) => serializer.serialize_f64( *x ),
        Value::Str( s ) =>
        {
          if s.starts_with( '~' )
          {
            serializer.serialize_str( &format!( "~{s}" ) )
          }
          else
          {
            serializer.serialize_str( s )
          }
        }
        Value::Keyword( k ) => serializer.serialize_str( &format!( "~:{}", k.qualified() ) ),
        Value::Uuid( u ) => serializer.serialize_str( &format!( "~u{u}" ) ),
        Value::Bytes( b ) => serializer.serialize_bytes( b ),
        Value::Vector( items ) =>
        {
          let mut seq = serializer.serialize_seq( Some( items.len() ) )?;
          for item in items
          {
            seq.serialize_element( item )?;
          }
          seq.end()
        }
        Value::Map( entries ) =>
        {
          let mut map = serializer.serialize_map( Some( entries.len() ) )?;
          for ( k, v ) in entries
          {
            map.serialize_entry( k, v )?;
          }
          map.end()
        }
        Value::Datom( d ) =>
        {
          let mut seq = serializer.serialize_seq( Some( 2 ) )?;
          seq.serialize_element( &RawTag( DATOM_TAG ) )?;
          seq.serialize_element( &Value::Vector( d.to_seq() ) )?;
          seq.end()
        }
      }
    }
  }

  struct ValueVisitor;

  impl< 'de > Visitor< 'de > for ValueVisitor
  {
    type Value = Value;

    fn expecting( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.write_str( "any wire value" )
    }

    fn visit_unit< E : de::Error >( self ) -> Result< Value, E >
    {
      Ok( Value::Nil )
    }

    fn visit_none< E : de::Error >( self ) -> Result< Value, E >
    {
      Ok( Value::Nil )
    }

    fn visit_some< D : Deserializer< 'de > >( self, deserializer : D ) -> Result< Value, D::Error >
    {
      deserializer.deserialize_any( self )
    }

    fn visit_bool< E : de::Error >( self, b : bool ) -> Result< Value, E >
    {
      Ok( Value::Bool( b ) )
    }

    fn visit_i64< E : de::Error >( self, i : i64 ) -> Result< Value, E >
    {
      Ok( Value::Int( i ) )
    }

    fn visit_u64< E : de::Error >( self, i : u64 ) -> Result< Value, E >
    {
      Ok( Value::Int( i as i64 ) )
    }

    fn visit_f64< E : de::Error >( self, x : f64 ) -> Result< Value, E >
    {
      Ok( Value::Float( x ) )
    }

    fn visit_str< E : de::Error >( self, s : &str ) -> Result< Value, E >
    {
      Ok( Value::Str( s.to_string() ) )
    }

    fn visit_string< E : de::Error >( self, s : String ) -> Result< Value, E >
    {
      Ok( Value::Str( s ) )
    }

    fn visit_bytes< E : de::Error >( self, b : &[ u8 ] ) -> Result< Value, E >
    {
      Ok( Value::Bytes( b.to_vec() ) )
    }

    fn visit_byte_buf< E : de::Error >( self, b : Vec< u8 > ) -> Result< Value, E >
    {
      Ok( Value::Bytes( b ) )
    }

    fn visit_seq< A : de::SeqAccess< 'de > >( self, mut seq : A ) -> Result< Value, A::Error >
    {
      let mut items = Vec::with_capacity( seq.size_hint().unwrap_or( 0 ) );
      while let Some( item ) = seq.next_element::< Value >()?
      {
        items.push( item );
      }
      Ok( Value::Vector( items ) )
    }

    fn visit_map< A : de::MapAccess< 'de > >( self, mut access : A ) -> Result< Value, A::Error >
    {
      let mut entries = BTreeMap::new();
      while let Some( ( k, v ) ) = access.next_entry::< Value, Value >()?
      {
        entries.insert( k, v );
      }
      Ok( Value::Map( entries ) )
    }
  }

  impl< 'de > Deserialize< 'de > for Value
  {
    fn deserialize< D : Deserializer< 'de > >( deserializer : D ) -> Result< Value, D::Error >
    {
      deserializer.deserialize_any( ValueVisitor )
    }
  }

  /// Apply the read handlers to a freshly decoded value : unescape strings,
  /// intern keyword and uuid tags, reconstruct tagged fact tuples.
  fn revive( value : Value ) -> Value
  {
    match value
    {
      Value::Str( s ) => revive_str( s ),
      Value::Vector( items ) =>
      {
        if is_tagged_datom( &items )
        {
          let inner = match &items[ 1 ]
          {
            Value::Vector( fields ) => fields.iter().cloned().map( revive ).collect::< Vec< _ > >(),
            _ => Vec::new(),
          };
          if let Some( datom ) = Datom::from_seq( &inner )
          {
            return Value::Datom( Box::new( datom ) );
          }
        }
        Value::Vector( items.into_iter().map( revive ).collect() )
      }
      Value::Map( entries ) => Value::Map
      (
        entries
          .into_iter()
          .map( | ( k, v ) | ( revive( k ), revive( v ) ) )
          .collect(),
      ),
      other => other,
    }
  }

  fn is_tagged_datom( items : &[ Value ] ) -> bool
  {
    items.len() == 2 && items[ 0 ].as_str() == Some( DATOM_TAG )
  }

  fn revive_str( s : String ) -> Value
  {
    if let Some( rest ) = s.strip_prefix( "~~" )
    {
      return Value::Str( format!( "~{rest}" ) );
    }
    if let Some( rest ) = s.strip_prefix( "~:" )
    {
      return Value::Keyword( Keyword::parse( rest ) );
    }
    if let Some( rest ) = s.strip_prefix( "~u" )
    {
      if let Ok( u ) = rest.parse::< uuid::Uuid >()
      {
        return Value::Uuid( u );
      }
    }
    Value::Str( s )
  }

  /// Read one edn form.
  ///
  /// Covers the subset the service emits on textual responses : atoms,
  /// strings, keywords, collections, and the `#uuid`/`#datom` tags.
  ///
  /// # Errors
  ///
  /// Returns a `fault` anomaly on malformed input.
  pub fn read_edn( text : &str ) -> DatomicResult< Value >
  {
    let mut reader = EdnReader { input : text.as_bytes(), position : 0 };
    reader.skip_whitespace();
    let value = reader.read_value()?;
    Ok( value )
  }

  struct EdnReader< 'a >
  {
    input : &'a [ u8 ],
    position : usize,
  }

  impl EdnReader< '_ >
  {
    fn peek( &self ) -> Option< u8 >
    {
      self.input.get( self.position ).copied()
    }

    fn bump( &mut self ) -> Option< u8 >
    {
      let b = self.peek()?;
      self.position += 1;
      Some( b )
    }

    fn fault( &self, what : &str ) -> Anomaly
    {
      Anomaly::fault( format!( "Cannot unmarshal edn : {what} at byte {}", self.position ) )
    }

    fn skip_whitespace( &mut self )
    {
      while let Some( b ) = self.peek()
      {
        match b
        {
          b' ' | b'\t' | b'\r' | b'\n' | b',' =>
          {
            self.position += 1;
          }
          b';' =>
          {
            while let Some( c ) = self.bump()
            {
              if c == b'\n'
              {
                break;
              }
            }
          }
          _ => break,
        }
      }
    }

    fn read_value( &mut self ) -> DatomicResult< Value >
    {
      match self.peek()
      {
        None => Err( self.fault( "unexpected end of input" ) ),
        Some( b'"' ) => self.read_string(),
        Some( b':' ) =>
        {
          self.position += 1;
          let token = self.read_token();
          Ok( Value::Keyword( Keyword::parse( &token ) ) )
        }
        Some( b'[' ) => self.read_sequence( b']' ),
        Some( b'(' ) => self.read_sequence( b')' ),
        Some( b'{' ) => self.read_map(),
        Some( b'#' ) => self.read_tagged(),
        Some( b ) if b == b'-' || b.is_ascii_digit() => self.read_number(),
        Some( _ ) =>
        {
          let token = self.read_token();
          match token.as_str()
          {
            "nil" => Ok( Value::Nil ),
            "true" => Ok( Value::Bool( true ) ),
            "false" => Ok( Value::Bool( false ) ),
            "" => Err( self.fault( "unexpected character" ) ),
            _ => Ok( Value::Str( token ) ),
          }
        }
      }
    }

    fn read_token( &mut self ) -> String
    {
      let start = self.position;
      while let Some( b ) = self.peek()
      {
        match b
        {
          b' ' | b'\t' | b'\r' | b'\n' | b',' | b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'"' => break,
          _ =>
          {
            self.position += 1;
          }
        }
      }
      String::from_utf8_lossy( &self.input[ start..self.position ] ).into_owned()
    }

    fn read_string( &mut self ) -> DatomicResult< Value >
    {
      self.position += 1;
      let mut out = Vec::new();
      loop
      {
        match self.bump()
        {
          None => return Err( self.fault( "unterminated string" ) ),
          Some( b'"' ) => return Ok( Value::Str( String::from_utf8_lossy( &out ).into_owned() ) ),
          Some( b'\\' ) => match self.bump()
          {
            Some( b'n' ) => out.push( b'\n' ),
            Some( b't' ) => out.push( b'\t' ),
            Some( b'r' ) => out.push( b'\r' ),
            Some( b'"' ) => out.push( b'"' ),
            Some( b'\\' ) => out.push( b'\\' ),
            _ => return Err( self.fault( "bad escape" ) ),
          },
          Some( b ) => out.push( b ),
        }
      }
    }

    fn read_number( &mut self ) -> DatomicResult< Value >
    {
      let token = self.read_token();
      if token.contains( '.' ) || token.contains( 'e' ) || token.contains( 'E' )
      {
        token
          .parse::< f64 >()
          .map( Value::Float )
          .map_err( | _ | self.fault( "bad float" ) )
      }
      else
      {
        token
          .parse::< i64 >()
          .map( Value::Int )
          .map_err( | _ | self.fault( "bad integer" ) )
      }
    }

    fn read_sequence( &mut self, close : u8 ) -> DatomicResult< Value >
    {
      self.position += 1;
      let mut items = Vec::new();
      loop
      {
        self.skip_whitespace();
        match self.peek()
        {
          None => return Err( self.fault( "unterminated sequence" ) ),
          Some( b ) if b == close =>
          {
            self.position += 1;
            return Ok( Value::Vector( items ) );
          }
          Some( _ ) => items.push( self.read_value()? ),
        }
      }
    }

    fn read_map( &mut self ) -> DatomicResult< Value >
    {
      self.position += 1;
      let mut entries = std::collections::BTreeMap::new();
      loop
      {
        self.skip_whitespace();
        match self.peek()
        {
          None => return Err( self.fault( "unterminated map" ) ),
          Some( b'}' ) =>
          {
            self.position += 1;
            return Ok( Value::Map( entries ) );
          }
          Some( _ ) =>
          {
            let k = self.read_value()?;
            self.skip_whitespace();
            let v = self.read_value()?;
            entries.insert( k, v );
          }
        }
      }
    }

    fn read_tagged( &mut self ) -> DatomicResult< Value >
    {
      self.position += 1;
      if self.peek() == Some( b'{' )
      {
        // Sets decode as sequences.
        return self.read_sequence( b'}' );
      }
      let tag = self.read_token();
      self.skip_whitespace();
      let value = self.read_value()?;
      match tag.as_str()
      {
        "uuid" => match &value
        {
          Value::Str( s ) => s
            .parse::< uuid::Uuid >()
            .map( Value::Uuid )
            .map_err( | _ | self.fault( "bad uuid" ) ),
          _ => Err( self.fault( "uuid tag expects a string" ) ),
        },
        "datom" => match &value
        {
          Value::Vector( fields ) => Datom::from_seq( fields )
            .map( | d | Value::Datom( Box::new( d ) ) )
            .ok_or_else( || self.fault( "datom tag expects 5 fields" ) ),
          _ => Err( self.fault( "datom tag expects a sequence" ) ),
        },
        _ => Ok( value ),
      }
    }
  }
}

crate::mod_interface!
{
  exposed use Format;
  exposed use Marshalled;
  exposed use marshal;
  exposed use unmarshal;
  exposed use unmarshal_content;
  exposed use read_edn;
  exposed use CONTENT_TYPE_TRANSIT_MSGPACK;
  exposed use CONTENT_TYPE_TRANSIT_JSON;
  exposed use CONTENT_TYPE_EDN;
  exposed use CONTENT_TYPE_TEXT;
}
