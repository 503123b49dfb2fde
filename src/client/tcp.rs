use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{self, pki_types::ServerName};
use tokio_rustls::TlsConnector;

use crate::client::Api;
use crate::common::{debug, Error, ErrorKind, Result};
use crate::protocol::connection::Connection;
use crate::protocol::{Frame, Request};

pub const DEFAULT_PORT: u16 = 6379;

// Client configuration.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    // store host.
    host: Option<String>,
    // store port.
    port: Option<u16>,
    // acl username. requires password.
    username: Option<String>,
    // AUTH password.
    password: Option<String>,
    // logical database selected after connecting.
    db: Option<u32>,
    // connect over tls.
    tls: Option<bool>,
    // pem encoded CA certificates used to verify the server.
    tls_ca_certificate: Option<PathBuf>,
    // Size of buffer allocated for the connection.
    connection_buffer_bytes: Option<usize>,
}

impl Config {
    const DEFAULT_HOST: &'static str = "127.0.0.1";
    const DEFAULT_CONNECTION_BUFFER_BYTES: usize = 1024 * 4;

    pub fn set_host(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.host = Some(val)
        }
    }
    pub fn set_port(&mut self, val: Option<u16>) {
        if let Some(val) = val {
            self.port = Some(val)
        }
    }
    pub fn set_username(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.username = Some(val)
        }
    }
    pub fn set_password(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.password = Some(val)
        }
    }
    pub fn set_db(&mut self, val: Option<u32>) {
        if let Some(val) = val {
            self.db = Some(val)
        }
    }
    pub fn set_tls(&mut self, val: Option<bool>) {
        if let Some(val) = val {
            self.tls = Some(val)
        }
    }
    pub fn set_tls_ca_certificate(&mut self, val: &mut Option<PathBuf>) {
        if let Some(val) = val.take() {
            self.tls_ca_certificate = Some(val)
        }
    }
    pub fn set_connection_buffer_bytes(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.connection_buffer_bytes = Some(std::cmp::max(val, 64));
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_host(&mut other.host);
        self.set_port(other.port);
        self.set_username(&mut other.username);
        self.set_password(&mut other.password);
        self.set_db(other.db);
        self.set_tls(other.tls);
        self.set_tls_ca_certificate(&mut other.tls_ca_certificate);
        self.set_connection_buffer_bytes(other.connection_buffer_bytes);
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(Config::DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    fn tls(&self) -> bool {
        self.tls.unwrap_or(false)
    }

    fn connection_buffer_bytes(&self) -> usize {
        self.connection_buffer_bytes
            .unwrap_or(Config::DEFAULT_CONNECTION_BUFFER_BYTES)
    }

    fn validate(&self) -> Result<()> {
        if self.username.is_some() && self.password.is_none() {
            return Err(Error::config("username requires a password"));
        }
        if self.tls() && self.tls_ca_certificate.is_none() {
            return Err(Error::config("tls requires a CA certificate file"));
        }
        Ok(())
    }

    fn load_root_store(path: &Path) -> Result<rustls::RootCertStore> {
        let mut reader = std::io::BufReader::new(std::fs::File::open(path)?);
        let mut roots = rustls::RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut reader) {
            roots.add(cert?)?;
        }
        if roots.is_empty() {
            return Err(ErrorKind::Tls {
                description: format!("no certificate found in {}", path.display()),
            }
            .into());
        }
        Ok(roots)
    }
}

pub struct Client<T = TcpStream> {
    connection: Connection<T>,
}

impl<T> Client<T>
where
    T: AsyncWrite + AsyncRead + Unpin + Send,
{
    pub fn new(stream: T, buffer_size: Option<usize>) -> Self {
        Self {
            connection: Connection::new(stream, buffer_size),
        }
    }

    // AUTH and SELECT according to config.
    async fn prepare(mut self, config: &Config) -> Result<Self> {
        if let Some(password) = config.password.as_deref() {
            self.auth(config.username.as_deref(), password).await?;
            debug!("Authenticated");
        }
        if let Some(db) = config.db {
            self.select(db).await?;
        }
        Ok(self)
    }
}

impl Client<TcpStream> {
    pub async fn insecure_from_addr(
        host: &str,
        port: u16,
        buffer_size: Option<usize>,
    ) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Client::new(stream, buffer_size))
    }
}

impl Client<TlsStream<TcpStream>> {
    pub async fn from_addr(
        host: &str,
        port: u16,
        ca_certificate: &Path,
        buffer_size: Option<usize>,
    ) -> Result<Self> {
        let roots = Config::load_root_store(ca_certificate)?;
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));

        let server_name = ServerName::try_from(host)
            .map_err(|e| ErrorKind::Tls {
                description: format!("invalid server name {}. {}", host, e),
            })?
            .to_owned();

        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        let stream = connector.connect(server_name, stream).await?;

        Ok(Client::new(stream, buffer_size))
    }
}

#[async_trait]
impl<T> Api for Client<T>
where
    T: AsyncWrite + AsyncRead + Unpin + Send,
{
    async fn command(&mut self, request: Request) -> Result<Frame> {
        self.connection.write_request(&request).await?;

        match self.connection.read_frame().await? {
            Some(frame) => Ok(frame),
            None => Err(ErrorKind::ConnectionResetByPeer.into()),
        }
    }
}

// Connect, authenticate and select db. the returned handle is the only
// connection a command uses.
pub async fn connect(config: &Config) -> Result<Box<dyn Api>> {
    config.validate()?;

    let host = config.host();
    let port = config.port();
    let buffer_size = Some(config.connection_buffer_bytes());
    debug!(%host, port, tls = config.tls(), "Connecting");

    let client: Box<dyn Api> = match config.tls_ca_certificate.as_deref() {
        Some(ca_certificate) if config.tls() => Box::new(
            Client::from_addr(host, port, ca_certificate, buffer_size)
                .await?
                .prepare(config)
                .await?,
        ),
        _ => Box::new(
            Client::insecure_from_addr(host, port, buffer_size)
                .await?
                .prepare(config)
                .await?,
        ),
    };

    Ok(client)
}

// Play the store over an in-memory pipe.
// each expectation is (request, reply), replies go through the real wire encoding.
#[cfg(test)]
pub(crate) async fn serve(stream: tokio::io::DuplexStream, script: Vec<(Request, Frame)>) {
    let mut conn = Connection::new(stream, None);
    for (want, reply) in script {
        let got = conn.read_frame().await.unwrap().unwrap();
        assert_eq!(Frame::from(want), got);
        conn.write_frame(&reply).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_select() {
        tokio_test::block_on(async move {
            let (client, server) = tokio::io::duplex(1024);
            let handle = tokio::spawn(serve(
                server,
                vec![
                    (
                        Request::new("AUTH").arg("admin").arg("secret"),
                        Frame::Simple("OK".into()),
                    ),
                    (Request::new("SELECT").arg("3"), Frame::Simple("OK".into())),
                ],
            ));

            let mut config = Config::default();
            config.set_username(&mut Some("admin".into()));
            config.set_password(&mut Some("secret".into()));
            config.set_db(Some(3));

            Client::new(client, None).prepare(&config).await.unwrap();
            handle.await.unwrap();
        })
    }

    #[test]
    fn auth_failure() {
        tokio_test::block_on(async move {
            let (client, server) = tokio::io::duplex(1024);
            let handle = tokio::spawn(serve(
                server,
                vec![(
                    Request::new("AUTH").arg("wrong"),
                    Frame::Error("WRONGPASS invalid username-password pair".into()),
                )],
            ));

            let mut config = Config::default();
            config.set_password(&mut Some("wrong".into()));

            let err = match Client::new(client, None).prepare(&config).await {
                Ok(_) => panic!("auth should fail"),
                Err(err) => err,
            };
            assert!(matches!(err.kind(), ErrorKind::Command { command, .. } if command == "AUTH"));
            handle.await.unwrap();
        })
    }

    #[test]
    fn typed_replies() {
        tokio_test::block_on(async move {
            let (client, server) = tokio::io::duplex(1024);
            let handle = tokio::spawn(serve(
                server,
                vec![
                    (
                        Request::new("KEYS").arg("user:*"),
                        Frame::Array(vec![
                            Frame::Bulk(b"user:1".to_vec()),
                            Frame::Bulk(b"user:2".to_vec()),
                        ]),
                    ),
                    (Request::new("DUMP").arg("user:1"), Frame::Bulk(vec![0, 1, 2])),
                    (Request::new("DUMP").arg("gone"), Frame::Null),
                    (Request::new("PTTL").arg("user:1"), Frame::Integer(-1)),
                    (
                        Request::restore(b"user:1", -1, &[0, 1, 2]),
                        Frame::Error("BUSYKEY Target key name already exists.".into()),
                    ),
                    (
                        Request::restore(b"user:2", 10, &[9]),
                        Frame::Error("ERR Bad data format".into()),
                    ),
                    (Request::new("DEL").arg("user:3"), Frame::Integer(0)),
                    (Request::new("FLUSHDB"), Frame::Simple("OK".into())),
                    (Request::new("TYPE").arg("user:1"), Frame::Simple("hash".into())),
                ],
            ));

            let mut client = Client::new(client, None);

            assert_eq!(
                client.keys("user:*").await.unwrap(),
                vec![b"user:1".to_vec(), b"user:2".to_vec()]
            );
            assert_eq!(client.dump(b"user:1").await.unwrap(), Some(vec![0, 1, 2]));
            assert_eq!(client.dump(b"gone").await.unwrap(), None);
            assert_eq!(client.pttl(b"user:1").await.unwrap(), -1);
            assert!(client
                .restore(b"user:1", -1, &[0, 1, 2])
                .await
                .unwrap_err()
                .is_busy_key());
            let err = client.restore(b"user:2", 10, &[9]).await.unwrap_err();
            assert!(!err.is_busy_key());
            assert_eq!(err.to_string(), "RESTORE user:2: ERR Bad data format");
            assert!(!client.delete(b"user:3").await.unwrap());
            client.flush_db().await.unwrap();
            assert_eq!(client.key_type(b"user:1").await.unwrap(), "hash");

            handle.await.unwrap();
        })
    }

    #[test]
    fn config_override_merge() {
        let mut file: Config = serde_yaml::from_str(
            "host: redis.internal\nport: 6380\npassword: from-file\nconnection_buffer_bytes: 8192\n",
        )
        .unwrap();
        let mut args = Config::default();
        args.set_password(&mut Some("from-args".into()));
        args.set_db(Some(2));

        file.override_merge(&mut args);

        assert_eq!(file.host(), "redis.internal");
        assert_eq!(file.port(), 6380);
        assert_eq!(file.password.as_deref(), Some("from-args"));
        assert_eq!(file.db, Some(2));
        assert_eq!(file.connection_buffer_bytes(), 8192);
        assert!(file.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let mut config = Config::default();
        config.set_tls(Some(true));
        assert!(config.validate().unwrap_err().is_config());

        let mut config = Config::default();
        config.set_username(&mut Some("admin".into()));
        assert!(config.validate().unwrap_err().is_config());

        let config = Config::default();
        assert_eq!(config.host(), "127.0.0.1");
        assert_eq!(config.port(), 6379);
    }
}
