//! Request signing : symmetric HMAC-SHA256 over the canonical request.
//!
//! The contract is intentionally narrow : given a well-formed request and
//! the four signing credentials, attach authentication headers. Nothing
//! else in the pipeline inspects what this module produces.

mod private
{
  use core::fmt::Write as _;

  use chrono::{ DateTime, Utc };
  use hmac::{ Hmac, Mac };
  use sha2::{ Digest, Sha256 };

  use crate::HttpRequest;

  type HmacSha256 = Hmac< Sha256 >;

  const ALGORITHM : &str = "AWS4-HMAC-SHA256";
  const REQUEST_KIND : &str = "aws4_request";
  const SIGNED_HEADERS : &str = "host;x-amz-date";

  /// The four credentials the signer is parameterized by.
  #[ derive( Clone, PartialEq, Eq ) ]
  pub struct SigningParams
  {
    /// Access key placed in the credential scope.
    pub access_key : String,
    /// Signing secret seeding the key derivation chain.
    pub secret : String,
    /// Service name.
    pub service : String,
    /// Region name.
    pub region : String,
  }

  impl core::fmt::Debug for SigningParams
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "SigningParams" )
        .field( "access_key", &self.access_key )
        .field( "secret", &"< REDACTED >" )
        .field( "service", &self.service )
        .field( "region", &self.region )
        .finish()
    }
  }

  /// Sign a request in place, stamping the current time.
  pub fn sign( request : &mut HttpRequest, params : &SigningParams )
  {
    sign_at( request, params, Utc::now() );
  }

  /// Sign a request in place with an explicit signing time.
  ///
  /// Adds `x-amz-date` and `authorization` headers. The signature covers
  /// the method, path, host, signing time, and a digest of the exact body
  /// bytes.
  pub fn sign_at( request : &mut HttpRequest, params : &SigningParams, when : DateTime< Utc > )
  {
    let timestamp = when.format( "%Y%m%dT%H%M%SZ" ).to_string();
    let datestamp = when.format( "%Y%m%d" ).to_string();
    request.set_header( "x-amz-date", timestamp.clone() );

    let payload_hash = hex( &Sha256::digest( &request.body ) );
    let canonical_request = format!
    (
      "POST\n{}\n\nhost:{}\nx-amz-date:{}\n\n{}\n{}",
      request.path, request.host, timestamp, SIGNED_HEADERS, payload_hash,
    );

    let scope = format!( "{datestamp}/{}/{}/{REQUEST_KIND}", params.region, params.service );
    let string_to_sign = format!
    (
      "{ALGORITHM}\n{timestamp}\n{scope}\n{}",
      hex( &Sha256::digest( canonical_request.as_bytes() ) ),
    );

    let k_date = hmac_digest( format!( "AWS4{}", params.secret ).as_bytes(), datestamp.as_bytes() );
    let k_region = hmac_digest( &k_date, params.region.as_bytes() );
    let k_service = hmac_digest( &k_region, params.service.as_bytes() );
    let k_signing = hmac_digest( &k_service, REQUEST_KIND.as_bytes() );
    let signature = hex( &hmac_digest( &k_signing, string_to_sign.as_bytes() ) );

    let authorization = format!
    (
      "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
      params.access_key,
    );
    request.set_header( "authorization", authorization );
  }

  fn hmac_digest( key : &[ u8 ], data : &[ u8 ] ) -> Vec< u8 >
  {
    let mut mac = HmacSha256::new_from_slice( key ).expect( "HMAC accepts keys of any length" );
    mac.update( data );
    mac.finalize().into_bytes().to_vec()
  }

  fn hex( bytes : &[ u8 ] ) -> String
  {
    bytes.iter().fold( String::with_capacity( bytes.len() * 2 ), | mut out, b | {
      let _ = write!( out, "{b:02x}" );
      out
    } )
  }
}

crate::mod_interface!
{
  exposed use SigningParams;
  exposed use sign;
  exposed use sign_at;
}
