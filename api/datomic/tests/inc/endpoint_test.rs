//! Endpoint parsing tests.

#[ allow( unused_imports ) ]
use super::*;
use the_module::{ parse_endpoint, Category, DEFAULT_PORT };

#[ test ]
fn bare_host_gets_https_and_the_default_port()
{
  let endpoint = parse_endpoint( Some( "example.com" ) ).unwrap().expect( "parses" );
  assert_eq!( endpoint.scheme, "https" );
  assert_eq!( endpoint.host, "example.com" );
  assert_eq!( endpoint.port, DEFAULT_PORT );
}

#[ test ]
fn explicit_port_is_honored()
{
  let endpoint = parse_endpoint( Some( "example.com:8080" ) ).unwrap().expect( "parses" );
  assert_eq!( endpoint.host, "example.com" );
  assert_eq!( endpoint.port, 8080 );
}

#[ test ]
fn absent_or_empty_endpoint_yields_nothing()
{
  // Validation reports the missing endpoint; parsing stays silent.
  assert_eq!( parse_endpoint( None ).unwrap(), None );
  assert_eq!( parse_endpoint( Some( "" ) ).unwrap(), None );
}

#[ test ]
fn malformed_endpoints_are_incorrect()
{
  for bad in [ "::bad::", "host:port:extra", "host:notaport", "host:", ":8080", "host:99999" ]
  {
    let anomaly = parse_endpoint( Some( bad ) ).expect_err( bad );
    assert_eq!( anomaly.category(), Category::Incorrect, "{bad}" );
  }
}
