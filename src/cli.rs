use clap::Parser;
use futures_util::TryStreamExt;
use gh_pulls::{GithubPull, Pull, PullFields, Repo};
use octocrab::Octocrab;
use std::env;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0)] // Just to make testing across clap features easier
struct Args {
    #[arg(long, short)]
    pr_num: u64,
    #[arg(long, short)]
    repo: String,
    /// New title for the pull request.
    #[arg(long)]
    title: Option<String>,
    /// Close the pull request after printing the summary.
    #[arg(long)]
    close: bool,
    /// Merge the pull request with the given commit message.
    #[arg(long)]
    merge: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let octo = Octocrab::builder()
        .personal_token(env::var("GITHUB_TOKEN")?)
        .build()?;
    let pull = GithubPull::new(octo, Repo::from_path(&args.repo)?, args.pr_num);

    if let Some(message) = &args.merge {
        pull.merge(message).await?;
        println!("Merged {}#{}", args.repo, args.pr_num);
        return Ok(());
    }

    let commits: Vec<_> = pull.commits().try_collect().await?;
    let fields = PullFields::new(pull);
    println!(
        "{}#{} [{}] {}",
        args.repo,
        args.pr_num,
        fields.state().await?,
        fields.title().await?
    );
    println!("{}", fields.html_url().await?);
    println!(
        "created {} / updated {} / {} commit(s)",
        fields.created_at().await?,
        fields.updated_at().await?,
        commits.len()
    );

    if let Some(title) = &args.title {
        fields.set_title(title).await?;
        println!("Retitled {}#{} to: {title}", args.repo, args.pr_num);
    }
    if args.close {
        fields.set_state("closed").await?;
        println!("Closed {}#{}", args.repo, args.pr_num);
    }

    Ok(())
}
