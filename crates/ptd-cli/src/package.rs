//! # Package Subcommands
//!
//! - `pack`: Build a package from NDJSON envelope files, one per entity
//!   type, optionally signing the manifest.
//! - `verify-package`: Open a package (every file hash checked), then
//!   optionally decode its entities and check the manifest signature.
//! - `inspect`: Print the manifest of a verified package.
//!
//! ## Usage
//!
//! ```bash
//! ptd pack --input match=matches.ndjson --input player=players.ndjson \
//!     --out finals.zip --key-file org.key.json
//! ptd verify-package finals.zip --public-key <base64> --entities
//! ptd inspect finals.zip --json
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Args;

use ptd_core::{EntityType, Envelope, PtdError};
use ptd_pack::config::DEFAULT_CREATOR;
use ptd_pack::{open_package, Compression, OpenOptions, Package, PackageBuilder, PackageConfig};

use crate::keys::{is_verification_failure, SignerArgs, VerifyKeyArgs};
use crate::EXIT_VERIFY_FAILED;

/// One `--input <type>=<path>` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInput {
    pub entity_type: EntityType,
    pub path: PathBuf,
}

impl FromStr for EntityInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <type>=<path>, got {s:?}"))?;
        if path.is_empty() {
            return Err(format!("missing path in {s:?}"));
        }
        let entity_type = ty.parse::<EntityType>().map_err(|e| e.to_string())?;
        Ok(Self {
            entity_type,
            path: PathBuf::from(path),
        })
    }
}

/// Arguments for `ptd pack`.
#[derive(Args, Debug)]
pub struct PackArgs {
    /// Entity input as `<type>=<path.ndjson>`. Repeat once per type.
    #[arg(short, long = "input", required = true)]
    pub inputs: Vec<EntityInput>,

    /// Output archive path.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Creator recorded in the manifest.
    #[arg(long, env = "PTD_CREATOR", default_value = DEFAULT_CREATOR)]
    pub creator: String,

    /// Free-text description recorded in the manifest.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Store entries uncompressed.
    #[arg(long)]
    pub stored: bool,

    #[command(flatten)]
    pub signer: SignerArgs,
}

/// Arguments for `ptd verify-package`.
#[derive(Args, Debug)]
pub struct VerifyPackageArgs {
    /// Package archive.
    pub package: PathBuf,

    /// Accept packages whose manifest lists files that are absent.
    #[arg(long)]
    pub lenient: bool,

    /// Decode and validate every entity record, checking counts.
    #[arg(long)]
    pub entities: bool,

    /// Fail when the manifest carries no signature.
    #[arg(long)]
    pub require_signature: bool,

    #[command(flatten)]
    pub keys: VerifyKeyArgs,
}

/// Arguments for `ptd inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Package archive.
    pub package: PathBuf,

    /// Print the manifest as JSON.
    #[arg(long)]
    pub json: bool,

    /// Accept packages whose manifest lists files that are absent.
    #[arg(long)]
    pub lenient: bool,
}

pub fn run_pack(args: &PackArgs) -> Result<u8> {
    let signer = args.signer.load()?;
    let compression = if args.stored {
        Compression::Stored
    } else {
        Compression::Deflated
    };
    let config = PackageConfig::default()
        .with_creator(&args.creator)
        .with_description(&args.description)
        .with_compression(compression);

    let mut builder = PackageBuilder::new(config);
    let mut seen = BTreeSet::new();
    for input in &args.inputs {
        if !seen.insert(input.entity_type) {
            bail!("entity type {} given more than once", input.entity_type);
        }
        let records = read_envelopes(&input.path, input.entity_type)?;
        tracing::debug!(entity_type = %input.entity_type, records = records.len(), "read input");
        builder.add_entities(input.entity_type, &records)?;
    }

    let manifest = builder
        .write_file(&args.out, signer.as_ref())
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    println!(
        "OK: wrote {} ({} files, {} bytes{})",
        args.out.display(),
        manifest.files.len(),
        manifest.total_size(),
        if manifest.signature.is_some() { ", signed" } else { "" }
    );
    Ok(0)
}

pub fn run_verify_package(args: &VerifyPackageArgs) -> Result<u8> {
    let keys = args.keys.load()?;
    let Some(package) = open_or_report(&args.package, &open_options(args.lenient))? else {
        return Ok(EXIT_VERIFY_FAILED);
    };
    let manifest = package.manifest();
    println!(
        "OK: {} files match manifest hashes",
        package.paths().count()
    );

    let mut failures = Vec::new();
    if args.entities {
        failures.extend(check_entities(&package)?);
    }

    match (&keys, &manifest.signature) {
        (Some(keys), _) => match keys.verify_package(&package) {
            Ok(()) => {
                if let Some(sig) = &manifest.signature {
                    println!(
                        "OK: manifest signed by {} (key {})",
                        sig.signed_by, sig.public_key_id
                    );
                }
            }
            Err(e) if is_verification_failure(&e) => failures.push(format!("signature: {e}")),
            Err(e) => return Err(e.into()),
        },
        (None, Some(sig)) if !args.require_signature => {
            println!(
                "signature: present (key {}), not checked without a verification key",
                sig.public_key_id
            );
        }
        (None, Some(_)) => bail!("--require-signature needs a verification key"),
        (None, None) if args.require_signature => {
            failures.push(format!("signature: {}", PtdError::SignatureMissing));
        }
        (None, None) => println!("signature: none"),
    }

    if failures.is_empty() {
        return Ok(0);
    }
    for f in &failures {
        println!("FAIL: {f}");
    }
    Ok(EXIT_VERIFY_FAILED)
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let Some(package) = open_or_report(&args.package, &open_options(args.lenient))? else {
        return Ok(EXIT_VERIFY_FAILED);
    };
    let m = package.manifest();
    if args.json {
        println!("{}", String::from_utf8_lossy(&m.to_json_pretty()?));
        return Ok(0);
    }

    println!("version:     {}", m.version);
    println!("created:     {}", m.created);
    println!("creator:     {}", m.creator);
    println!("description: {}", m.description);
    match &m.signature {
        Some(sig) => println!(
            "signature:   {} key={} by={} at={}",
            sig.algorithm, sig.public_key_id, sig.signed_by, sig.signed_at
        ),
        None => println!("signature:   none"),
    }
    println!();
    println!("files ({}, {} bytes):", m.files.len(), m.total_size());
    for f in m.files.values() {
        let present = if package.file(&f.path).is_some() { "" } else { "  (absent)" };
        println!(
            "  {:<32} {:>10}  {:<22} {}{present}",
            f.path, f.size, f.content_type, f.hash
        );
    }
    println!();
    println!("entities:");
    for c in m.entities.values() {
        println!("  {:<12} {}", c.entity_type, c.count);
    }
    Ok(0)
}

fn open_options(lenient: bool) -> OpenOptions {
    if lenient {
        OpenOptions::lenient()
    } else {
        OpenOptions::default()
    }
}

/// Open `path`, printing a `FAIL:` line and yielding `None` when the package
/// does not verify.
fn open_or_report(path: &Path, options: &OpenOptions) -> Result<Option<Package>> {
    match open_package(path, options) {
        Ok(package) => Ok(Some(package)),
        Err(e) if is_verification_failure(&e) => {
            println!("FAIL: {}: {e}", path.display());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("failed to open {}", path.display())),
    }
}

/// Decode every entity file listed in the manifest and validate each record.
fn check_entities(package: &Package) -> Result<Vec<String>> {
    let mut failures = Vec::new();
    for (name, listed) in &package.manifest().entities {
        let entity_type = match name.parse::<EntityType>() {
            Ok(t) => t,
            Err(e) => {
                failures.push(format!("entities: {e}"));
                continue;
            }
        };
        let records = match package.read_entities::<Envelope>(entity_type) {
            Ok(records) => records,
            Err(PtdError::FileMissing(path)) => {
                println!("skipped: {path} (absent)");
                continue;
            }
            Err(PtdError::Serialization(msg)) => {
                failures.push(format!("entities: {msg}"));
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        for record in &records {
            if let Err(e) = record.validate() {
                failures.push(format!("{}: {e}", record.id));
            } else if record.entity_type != entity_type {
                failures.push(format!("{}: stored under {entity_type}", record.id));
            }
        }
        if records.len() as u64 != listed.count {
            failures.push(format!(
                "{entity_type}: manifest counts {}, file holds {}",
                listed.count,
                records.len()
            ));
        } else {
            println!("OK: {entity_type}: {} records", records.len());
        }
    }
    Ok(failures)
}

/// Read one envelope per non-blank line, validating each against `expected`.
fn read_envelopes(path: &Path, expected: EntityType) -> Result<Vec<Envelope>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let at = || format!("{} line {}", path.display(), n + 1);
        let envelope: Envelope = serde_json::from_str(line).with_context(at)?;
        envelope.validate().with_context(at)?;
        if envelope.entity_type != expected {
            bail!(
                "{}: {} record in {expected} input",
                at(),
                envelope.entity_type
            );
        }
        records.push(envelope);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptd_core::IdGenerator;
    use ptd_crypto::Signer;
    use serde_json::json;

    const MARKER: &str = "Main-Draw-Marker";

    struct Fixture {
        dir: tempfile::TempDir,
        signer: Signer,
        key_file: PathBuf,
        matches: PathBuf,
        players: PathBuf,
    }

    fn write_ndjson(path: &Path, records: &[Envelope]) {
        let mut text = String::new();
        for r in records {
            text.push_str(&serde_json::to_string(r).unwrap());
            text.push('\n');
        }
        std::fs::write(path, text).unwrap();
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let gen = IdGenerator::new();
        let signer = Signer::generate("org", "organizer").unwrap();
        let key_file = dir.path().join("org.key.json");
        std::fs::write(
            &key_file,
            serde_json::to_vec(&signer.key_pair().to_exported()).unwrap(),
        )
        .unwrap();

        let matches: Vec<Envelope> = (1..=2)
            .map(|n| {
                let spec = json!({"draw": MARKER, "n": n});
                Envelope::create(&gen, EntityType::Match, spec, "cli")
            })
            .collect();
        let ada = json!({"name": "Ada"});
        let players = vec![Envelope::create(&gen, EntityType::Player, ada, "cli")];
        let matches_path = dir.path().join("matches.ndjson");
        let players_path = dir.path().join("players.ndjson");
        write_ndjson(&matches_path, &matches);
        write_ndjson(&players_path, &players);

        Fixture {
            dir,
            signer,
            key_file,
            matches: matches_path,
            players: players_path,
        }
    }

    fn pack_args(f: &Fixture, out: &Path, sign: bool, stored: bool) -> PackArgs {
        PackArgs {
            inputs: vec![
                EntityInput {
                    entity_type: EntityType::Match,
                    path: f.matches.clone(),
                },
                EntityInput {
                    entity_type: EntityType::Player,
                    path: f.players.clone(),
                },
            ],
            out: out.to_path_buf(),
            creator: "unit-tests".to_string(),
            description: "finals".to_string(),
            stored,
            signer: SignerArgs {
                key_file: sign.then(|| f.key_file.clone()),
                key_id: "org".to_string(),
                signed_by: "organizer".to_string(),
            },
        }
    }

    fn verify_args(package: &Path, public_key: Option<String>) -> VerifyPackageArgs {
        VerifyPackageArgs {
            package: package.to_path_buf(),
            lenient: false,
            entities: true,
            require_signature: false,
            keys: VerifyKeyArgs {
                public_key,
                ..Default::default()
            },
        }
    }

    #[test]
    fn parse_entity_input() {
        let input: EntityInput = "match=data/m.ndjson".parse().unwrap();
        assert_eq!(input.entity_type, EntityType::Match);
        assert_eq!(input.path, PathBuf::from("data/m.ndjson"));

        assert!("match".parse::<EntityInput>().is_err());
        assert!("match=".parse::<EntityInput>().is_err());
        assert!("game=x.ndjson".parse::<EntityInput>().is_err());
    }

    #[test]
    fn pack_sign_and_verify() {
        let f = fixture();
        let out = f.dir.path().join("finals.zip");
        assert_eq!(run_pack(&pack_args(&f, &out, true, false)).unwrap(), 0);

        let package = open_package(&out, &OpenOptions::default()).unwrap();
        assert_eq!(package.manifest().creator, "unit-tests");
        assert_eq!(package.manifest().entity_count(EntityType::Match), 2);

        let ok = run_verify_package(&verify_args(&out, Some(f.signer.public_key_b64()))).unwrap();
        assert_eq!(ok, 0);

        let other = Signer::generate("org", "x").unwrap();
        let bad = run_verify_package(&verify_args(&out, Some(other.public_key_b64()))).unwrap();
        assert_eq!(bad, EXIT_VERIFY_FAILED);

        let inspect = InspectArgs {
            package: out,
            json: true,
            lenient: false,
        };
        assert_eq!(run_inspect(&inspect).unwrap(), 0);
    }

    #[test]
    fn tampered_package_fails_verification() {
        let f = fixture();
        let out = f.dir.path().join("stored.zip");
        run_pack(&pack_args(&f, &out, false, true)).unwrap();

        let mut bytes = std::fs::read(&out).unwrap();
        let pos = bytes
            .windows(MARKER.len())
            .position(|w| w == MARKER.as_bytes())
            .unwrap();
        bytes[pos] ^= 0x20;
        std::fs::write(&out, bytes).unwrap();

        assert_eq!(
            run_verify_package(&verify_args(&out, None)).unwrap(),
            EXIT_VERIFY_FAILED
        );
        let inspect = InspectArgs {
            package: out,
            json: false,
            lenient: false,
        };
        assert_eq!(run_inspect(&inspect).unwrap(), EXIT_VERIFY_FAILED);
    }

    #[test]
    fn corrupted_deflated_package_fails_verification() {
        let f = fixture();
        let out = f.dir.path().join("deflated.zip");
        run_pack(&pack_args(&f, &out, false, false)).unwrap();

        let mut bytes = std::fs::read(&out).unwrap();
        let (start, len) = {
            let mut zip = zip::ZipArchive::new(std::io::Cursor::new(&bytes)).unwrap();
            let entry = zip
                .by_name(&ptd_pack::entity_file_path(EntityType::Match))
                .unwrap();
            (entry.data_start() as usize, entry.compressed_size() as usize)
        };
        bytes[start + len / 2] ^= 0xff;
        std::fs::write(&out, bytes).unwrap();

        assert_eq!(
            run_verify_package(&verify_args(&out, None)).unwrap(),
            EXIT_VERIFY_FAILED
        );
    }

    #[test]
    fn unsigned_package_and_require_signature() {
        let f = fixture();
        let out = f.dir.path().join("unsigned.zip");
        run_pack(&pack_args(&f, &out, false, false)).unwrap();

        assert_eq!(run_verify_package(&verify_args(&out, None)).unwrap(), 0);

        let mut strict = verify_args(&out, None);
        strict.require_signature = true;
        assert_eq!(run_verify_package(&strict).unwrap(), EXIT_VERIFY_FAILED);

        let keyed = verify_args(&out, Some(f.signer.public_key_b64()));
        assert_eq!(run_verify_package(&keyed).unwrap(), EXIT_VERIFY_FAILED);
    }

    #[test]
    fn pack_rejects_mismatched_and_duplicate_inputs() {
        let f = fixture();
        let out = f.dir.path().join("bad.zip");

        let mut wrong_type = pack_args(&f, &out, false, false);
        wrong_type.inputs[0].entity_type = EntityType::Venue;
        assert!(run_pack(&wrong_type).is_err());

        let mut duplicate = pack_args(&f, &out, false, false);
        duplicate.inputs[1].entity_type = EntityType::Match;
        assert!(run_pack(&duplicate).is_err());

        assert!(!out.exists());
    }

    #[test]
    fn non_zip_is_operational_error() {
        let f = fixture();
        let path = f.dir.path().join("not.zip");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(run_verify_package(&verify_args(&path, None)).is_err());
    }
}
