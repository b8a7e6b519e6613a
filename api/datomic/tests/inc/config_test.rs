//! Configuration resolution tests : source precedence, the home file,
//! and validation.

#[ allow( unused_imports ) ]
use super::*;
use std::io::Write as _;

use the_module::{ Config, env_config, home_config, resolve_from_sources, validate, DEFAULT_TIMEOUT_MSEC };

#[ test ]
fn defaults_then_environment_then_user_arguments()
{
  let env = Config::new()
    .with_account_id( "env-account" )
    .with_access_key( "env-key" )
    .with_secret( "env-secret" )
    .with_endpoint( "env-host:9000" )
    .with_service( "env-svc" )
    .with_region( "env-region" );
  let user = Config::new().with_region( "user-region" ).with_db_name( "movies" );

  let resolved = resolve_from_sources( user, env, Config::new );
  assert_eq!( resolved.timeout, Some( DEFAULT_TIMEOUT_MSEC ) );
  assert_eq!( resolved.account_id.as_deref(), Some( "env-account" ) );
  assert_eq!( resolved.endpoint.as_deref(), Some( "env-host:9000" ) );
  // User arguments override the environment.
  assert_eq!( resolved.region.as_deref(), Some( "user-region" ) );
  assert_eq!( resolved.db_name.as_deref(), Some( "movies" ) );
  assert!( resolved.is_valid() );
  assert_eq!( validate( resolved.clone() ).expect( "valid" ), resolved );
}

#[ test ]
fn home_file_fills_in_only_when_still_invalid()
{
  let env = Config::new().with_endpoint( "env-host" );
  let home = Config::new()
    .with_account_id( "home-account" )
    .with_access_key( "home-key" )
    .with_secret( "home-secret" )
    .with_endpoint( "home-host" )
    .with_service( "home-svc" )
    .with_region( "home-region" );

  let resolved = resolve_from_sources( Config::new(), env, || home );
  // Existing fields win over the home file; the file only fills gaps.
  assert_eq!( resolved.endpoint.as_deref(), Some( "env-host" ) );
  assert_eq!( resolved.account_id.as_deref(), Some( "home-account" ) );
  assert!( resolved.is_valid() );
}

#[ test ]
fn complete_sources_never_touch_the_home_file()
{
  let env = Config::new()
    .with_account_id( "a" )
    .with_access_key( "k" )
    .with_secret( "s" )
    .with_endpoint( "h:9000" )
    .with_service( "svc" )
    .with_region( "r" );
  let resolved = resolve_from_sources( Config::new(), env, || panic!( "home file must not be read" ) );
  assert!( resolved.is_valid() );
}

#[ test ]
fn environment_variables_feed_the_environment_source()
{
  // This test owns the DATOMIC_* variables; nothing else in the suite
  // reads them implicitly.
  let vars =
  [
    ( "DATOMIC_ACCOUNT_ID", "a" ),
    ( "DATOMIC_ACCESS_KEY", "k" ),
    ( "DATOMIC_SECRET", "s" ),
    ( "DATOMIC_ENDPOINT", "h:9000" ),
    ( "DATOMIC_SERVICE", "svc" ),
    ( "DATOMIC_REGION", "r" ),
  ];
  for ( var, value ) in vars
  {
    std::env::set_var( var, value );
  }

  let resolved = resolve_from_sources( Config::new(), env_config(), Config::new );

  for ( var, _ ) in vars
  {
    std::env::remove_var( var );
  }

  let expected = Config::new()
    .with_timeout( DEFAULT_TIMEOUT_MSEC )
    .with_account_id( "a" )
    .with_access_key( "k" )
    .with_secret( "s" )
    .with_endpoint( "h:9000" )
    .with_service( "svc" )
    .with_region( "r" );
  assert_eq!( resolved, expected );
  assert_eq!( validate( resolved ).expect( "valid" ), expected );
}

#[ test ]
fn home_file_parses_key_value_lines()
{
  let dir = tempfile::tempdir().expect( "tempdir" );
  let path = dir.path().join( "config" );
  let mut file = std::fs::File::create( &path ).expect( "create" );
  writeln!( file, "  account-id = spaced-account  " ).unwrap();
  writeln!( file ).unwrap();
  writeln!( file, "endpoint=h:9000" ).unwrap();
  writeln!( file, "secret=s=with=equals" ).unwrap();
  drop( file );

  let config = home_config( &path );
  assert_eq!( config.account_id.as_deref(), Some( "spaced-account" ) );
  assert_eq!( config.endpoint.as_deref(), Some( "h:9000" ) );
  // The first '=' splits; the rest belongs to the value.
  assert_eq!( config.secret.as_deref(), Some( "s=with=equals" ) );
}

#[ test ]
fn unparsable_home_file_contributes_nothing()
{
  let dir = tempfile::tempdir().expect( "tempdir" );
  let path = dir.path().join( "config" );
  std::fs::write( &path, "account-id = fine\nthis line has no equals sign\n" ).expect( "write" );

  let config = home_config( &path );
  assert_eq!( config, Config::new() );
}

#[ test ]
fn absent_home_file_contributes_nothing()
{
  let dir = tempfile::tempdir().expect( "tempdir" );
  let config = home_config( &dir.path().join( "no-such-file" ) );
  assert_eq!( config, Config::new() );
}

#[ test ]
fn validation_rejects_incomplete_configs()
{
  let partial = Config::new().with_account_id( "a" ).with_secret( "" );
  let anomaly = validate( partial ).expect_err( "incomplete" );
  assert_eq!( anomaly.category(), the_module::Category::Incorrect );
  assert!( anomaly.message().unwrap().starts_with( "Incomplete or invalid connection config:" ) );
}

#[ test ]
fn debug_output_redacts_the_secret()
{
  let config = Config::new().with_secret( "hunter2" ).with_account_id( "a" );
  let text = format!( "{config:?}" );
  assert!( !text.contains( "hunter2" ) );
  assert!( text.contains( "REDACTED" ) );
}
