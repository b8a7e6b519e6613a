//! Logical operations and their HTTP request form.

mod private
{
  use bytes::Bytes;

  use crate::
  {
    Endpoint, HttpRequest, Marshalled, SigningParams, sign,
    CONTENT_TYPE_TRANSIT_MSGPACK,
  };

  /// Header naming the qualified operation.
  pub const HEADER_OP : &str = "x-nano-op";
  /// Header naming the target database of non-catalog operations.
  pub const HEADER_TARGET : &str = "x-nano-target";
  /// Header carrying a continuation token.
  pub const HEADER_NEXT : &str = "x-nano-next";

  /// The protocol operations.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash ) ]
  pub enum Op
  {
    /// Connection liveness and watermark probe.
    Status,
    /// Index scan.
    Datoms,
    /// Attribute range scan.
    IndexRange,
    /// Hierarchical selection for one entity.
    Pull,
    /// Declarative query.
    Q,
    /// Transaction log range.
    TxRange,
    /// Submit a transaction.
    Transact,
    /// Obtain a speculative database.
    WithDb,
    /// Apply a transaction speculatively.
    With,
    /// Database statistics.
    DbStats,
    /// Fetch the next chunk of a streamed result.
    Next,
    /// Catalog : resolve a database name to its identifier.
    ResolveDb,
    /// Catalog : create a database.
    CreateDb,
    /// Catalog : delete a database.
    DeleteDb,
    /// Catalog : list databases.
    ListDbs,
  }

  impl Op
  {
    /// The operation's bare name.
    #[ must_use ]
    pub fn name( self ) -> &'static str
    {
      match self
      {
        Self::Status => "status",
        Self::Datoms => "datoms",
        Self::IndexRange => "index-range",
        Self::Pull => "pull",
        Self::Q => "q",
        Self::TxRange => "tx-range",
        Self::Transact => "transact",
        Self::WithDb => "with-db",
        Self::With => "with",
        Self::DbStats => "db-stats",
        Self::Next => "next",
        Self::ResolveDb => "resolve-db",
        Self::CreateDb => "create-db",
        Self::DeleteDb => "delete-db",
        Self::ListDbs => "list-dbs",
      }
    }

    /// True for operations in the catalog namespace.
    #[ must_use ]
    pub fn is_catalog( self ) -> bool
    {
      matches!( self, Self::ResolveDb | Self::CreateDb | Self::DeleteDb | Self::ListDbs )
    }

    /// The qualified operation string placed in the op header : catalog
    /// operations keep their own namespace, all others live under the
    /// client protocol namespace.
    #[ must_use ]
    pub fn qualified( self ) -> String
    {
      if self.is_catalog()
      {
        format!( "datomic.catalog/{}", self.name() )
      }
      else
      {
        format!( "datomic.client.protocol/{}", self.name() )
      }
    }
  }

  /// Build and sign the HTTP POST for one logical request.
  ///
  /// The target header is added only for non-catalog operations; the
  /// continuation header appears iff a token is supplied. The body is a
  /// view over exactly the marshalled payload's `length` bytes.
  #[ must_use ]
  pub fn build_request
  (
    endpoint : &Endpoint,
    database_id : Option< &str >,
    op : Op,
    next_token : Option< &str >,
    payload : &Marshalled,
    signing : &SigningParams,
  )
  -> HttpRequest
  {
    let mut request = HttpRequest::new( endpoint.scheme.clone(), endpoint.host.clone(), endpoint.port );
    request.set_header( "host", endpoint.host.clone() );
    request.set_header( "content-type", CONTENT_TYPE_TRANSIT_MSGPACK );
    request.set_header( "accept", CONTENT_TYPE_TRANSIT_MSGPACK );
    request.set_header( HEADER_OP, op.qualified() );
    if !op.is_catalog()
    {
      if let Some( id ) = database_id
      {
        request.set_header( HEADER_TARGET, id );
      }
    }
    if let Some( token ) = next_token
    {
      request.set_header( HEADER_NEXT, token );
    }
    request.body = Bytes::copy_from_slice( payload.payload() );
    sign( &mut request, signing );
    request
  }
}

crate::mod_interface!
{
  exposed use Op;
  exposed use build_request;
  exposed use HEADER_OP;
  exposed use HEADER_TARGET;
  exposed use HEADER_NEXT;
}
