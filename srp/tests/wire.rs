use failure::Error;
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;

use srp::algo::{AuthResult, SRP};
use srp::client::{Client, SimplifiedClient, StandardClient, ZeroKeyClient};
use srp::dictionary::{Dictionary, WordFile, WordList};
use srp::errors::SrpError;
use srp::mitm::{Mitm, MitmConfig};
use srp::server::{serve, Server, SimplifiedServer, StandardServer, StandardVerifier};
use srp::variant::Variant;

const WORDS: [&str; 12] = [
    "123456", "password", "12345678", "qwerty", "letmein", "football", "iloveyou", "admin",
    "welcome", "monkey", "dragon", "master",
];

type Outcomes = Vec<Result<Option<AuthResult>, Error>>;

fn start_server<V>(mut server: Server<V>, connections: usize) -> (u16, thread::JoinHandle<Outcomes>)
where
    V: Variant + Send + 'static,
{
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    let join_handle = thread::spawn(move || {
        let mut outcomes = Vec::new();
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().unwrap();
            outcomes.push(server.handle_client(&mut stream));
        }
        outcomes
    });
    (port, join_handle)
}

fn connect_and_execute<F>(port: u16, action: F) -> Result<(), Error>
where
    F: FnOnce(&mut TcpStream) -> Result<(), Error>,
{
    let mut stream = TcpStream::connect(("127.0.0.1", port))?;
    let result = action(&mut stream);
    let _ = stream.shutdown(Shutdown::Both);
    result
}

/// Keeps a copy of every byte that crosses the stream in either direction.
struct Recorder<T> {
    inner: T,
    transcript: Vec<u8>,
}

impl<T: Read> Read for Recorder<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.transcript.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl<T: Write> Write for Recorder<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.transcript.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[test]
fn register_then_login() {
    let (port, join_handle) = start_server(StandardServer::new(SRP::new()), 3);
    let client = StandardClient::new(b"alice", b"correct horse", SRP::new());
    let impostor = StandardClient::new(b"alice", b"wrong horse", SRP::new());

    connect_and_execute(port, |stream| client.register(stream)).unwrap();
    connect_and_execute(port, |stream| client.login(stream)).unwrap();
    let err = connect_and_execute(port, |stream| impostor.login(stream)).unwrap_err();
    assert_eq!(err.downcast_ref::<SrpError>(), Some(&SrpError::LoginFailed));

    let outcomes = join_handle.join().unwrap();
    assert!(matches!(outcomes[0], Ok(None)));
    assert!(matches!(outcomes[1], Ok(Some(AuthResult::Accepted))));
    assert!(matches!(outcomes[2], Ok(Some(AuthResult::Rejected))));
}

#[test]
fn simplified_register_then_login() {
    let (port, join_handle) = start_server(SimplifiedServer::new(SRP::new()), 2);
    let client = SimplifiedClient::new(b"bob", b"hunter2", SRP::new());
    connect_and_execute(port, |stream| client.register(stream)).unwrap();
    connect_and_execute(port, |stream| client.login(stream)).unwrap();
    let outcomes = join_handle.join().unwrap();
    assert!(matches!(outcomes[1], Ok(Some(AuthResult::Accepted))));
}

#[test]
fn duplicate_registration_is_refused() {
    let (port, join_handle) = start_server(StandardServer::new(SRP::new()), 2);
    let client = StandardClient::new(b"alice", b"pw", SRP::new());
    connect_and_execute(port, |stream| client.register(stream)).unwrap();
    let err = connect_and_execute(port, |stream| client.register(stream)).unwrap_err();
    assert_eq!(err.downcast_ref::<SrpError>(), Some(&SrpError::IdentityTaken));
    join_handle.join().unwrap();
}

#[test]
fn unknown_identity_closes_connection() {
    let (port, join_handle) = start_server(StandardServer::new(SRP::new()), 1);
    let client = StandardClient::new(b"nobody", b"pw", SRP::new());
    assert!(connect_and_execute(port, |stream| client.login(stream)).is_err());
    let outcomes = join_handle.join().unwrap();
    let err = outcomes[0].as_ref().unwrap_err();
    assert_eq!(err.downcast_ref::<SrpError>(), Some(&SrpError::UnknownIdentity));
}

#[test]
fn password_never_crosses_the_wire() {
    let password = b"correct horse battery staple";
    let (port, join_handle) = start_server(StandardServer::new(SRP::new()), 2);
    let client = StandardClient::new(b"alice", password, SRP::new());

    let mut transcript = Vec::new();
    for register in [true, false].iter() {
        connect_and_execute(port, |stream| {
            let mut recorder = Recorder {
                inner: stream,
                transcript: Vec::new(),
            };
            if *register {
                client.register(&mut recorder)?;
            } else {
                client.login(&mut recorder)?;
            }
            transcript.extend(recorder.transcript);
            Ok(())
        })
        .unwrap();
    }
    join_handle.join().unwrap();

    assert!(contains(&transcript, b"alice"));
    assert!(!contains(&transcript, password));
}

#[test]
fn zero_key_client() {
    let (port, join_handle) = start_server(StandardServer::new(SRP::new()), 3);
    let client = StandardClient::new(b"alice", b"unguessable", SRP::new());
    connect_and_execute(port, |stream| client.register(stream)).unwrap();
    for multiple in 0..2 {
        let attacker = ZeroKeyClient::new(b"alice", &SRP::new(), multiple);
        assert!(connect_and_execute(port, |stream| attacker.login(stream, false)).is_err());
    }
    let outcomes = join_handle.join().unwrap();
    for outcome in &outcomes[1..] {
        let err = outcome.as_ref().unwrap_err();
        assert_eq!(err.downcast_ref::<SrpError>(), Some(&SrpError::DegeneratePublicValue));
    }

    // The simplified server does no checks on A.
    let (port, join_handle) = start_server(SimplifiedServer::new(SRP::new()), 2);
    let client = SimplifiedClient::new(b"alice", b"unguessable", SRP::new());
    connect_and_execute(port, |stream| client.register(stream)).unwrap();
    let attacker = ZeroKeyClient::new(b"alice", &SRP::new(), 2);
    connect_and_execute(port, |stream| attacker.login(stream, true)).unwrap();
    let outcomes = join_handle.join().unwrap();
    assert!(matches!(outcomes[1], Ok(Some(AuthResult::Accepted))));
}

#[test]
fn verifier_session_over_stream() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    let join_handle = thread::spawn(move || -> Result<AuthResult, Error> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut verifier = StandardVerifier::new_with_rng(b"carol", b"pw", SRP::new(), &mut rng);
        let (mut stream, _) = listener.accept()?;
        serve(&mut verifier, &mut stream)
    });
    let client = Client::<srp::variant::Standard>::new(b"carol", b"pw", SRP::new());
    connect_and_execute(port, |stream| client.login(stream)).unwrap();
    assert_eq!(join_handle.join().unwrap().unwrap(), AuthResult::Accepted);
}

fn start_mitm<D>(dictionary: D, workers: usize) -> (u16, thread::JoinHandle<Result<Vec<u8>, Error>>)
where
    D: Dictionary + Send + 'static,
{
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    let join_handle = thread::spawn(move || -> Result<Vec<u8>, Error> {
        let config = MitmConfig {
            workers,
            ..MitmConfig::default()
        };
        let mut mitm = Mitm::with_config(SRP::new(), config, dictionary);
        let (mut stream, _) = listener.accept()?;
        serve(&mut mitm, &mut stream)
    });
    (port, join_handle)
}

#[test]
fn mitm_recovers_password() {
    for workers in [1, 4].iter() {
        let (port, join_handle) = start_mitm(WordList::new(&WORDS), *workers);
        let client = SimplifiedClient::new(b"alice", b"dragon", SRP::new());
        connect_and_execute(port, |stream| client.login(stream)).unwrap();
        assert_eq!(join_handle.join().unwrap().unwrap(), b"dragon".to_vec());
    }
}

#[test]
fn mitm_reads_word_file() {
    let path = std::env::temp_dir().join(format!("srp-wire-words-{}.txt", std::process::id()));
    {
        let mut file = File::create(&path).unwrap();
        for word in WORDS.iter() {
            writeln!(file, "{}", word).unwrap();
        }
    }
    let (port, join_handle) = start_mitm(WordFile::new(&path), 3);
    let client = SimplifiedClient::new(b"alice", b"iloveyou", SRP::new());
    connect_and_execute(port, |stream| client.login(stream)).unwrap();
    assert_eq!(join_handle.join().unwrap().unwrap(), b"iloveyou".to_vec());
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn mitm_dictionary_exhausted() {
    let (port, join_handle) = start_mitm(WordList::new(&WORDS), 2);
    let client = SimplifiedClient::new(b"alice", b"Tr0ub4dor&3", SRP::new());
    assert!(connect_and_execute(port, |stream| client.login(stream)).is_err());
    let err = join_handle.join().unwrap().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SrpError>(),
        Some(&SrpError::DictionaryExhausted {
            candidates: WORDS.len()
        })
    );
}
