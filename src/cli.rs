//! Interface de linha de comando do genboard baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos agrupados por recurso
//! (generate, jobs, products, uploads, standards, dashboard, health)
//! e flags globais (--config, --base-url, --api-version, --json, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::api::{ApiVersion, PageRequest};
use crate::model::{
    Curriculum, ElaStandardType, JobStatus, Locale, ProductStatus, ProductType, RequestError,
    ResourceId, TemplateType, UploadStatus, WorldviewFlag,
};

/// genboard: cliente administrativo da plataforma de geração de conteúdo.
#[derive(Debug, Parser)]
#[command(name = "genboard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: ./genboard.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// URL base do backend; sobrepõe o arquivo e GENBOARD_API_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Revisão do contrato REST.
    #[arg(long, global = true, value_enum)]
    pub api_version: Option<ApiVersion>,

    /// Imprime JSON em vez de tabelas.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solicita a geração de produtos ou templates ELA.
    Generate {
        #[command(subcommand)]
        target: GenerateCommand,
    },

    /// Jobs de geração.
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },

    /// Produtos gerados.
    Products {
        #[command(subcommand)]
        command: ProductsCommand,
    },

    /// Fila de upload.
    Uploads {
        #[command(subcommand)]
        command: UploadsCommand,
    },

    /// Curriculum standards.
    Standards {
        #[command(subcommand)]
        command: StandardsCommand,
    },

    /// Métricas agregadas e itens recentes.
    Dashboard {
        /// Quantos produtos e jobs recentes mostrar.
        #[arg(long, default_value_t = 5)]
        recent: u32,
    },

    /// Verifica se o backend responde.
    Health,
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommand {
    /// Worksheet, quiz, passage or assessment.
    Product(ProductArgs),
    /// ELA template for grades 6-8.
    Template(TemplateArgs),
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    #[arg(long)]
    pub standard_id: u64,

    #[arg(long = "type", value_enum)]
    pub product_type: ProductType,

    #[arg(long)]
    pub grade: u32,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Acompanha o job até terminar.
    #[arg(long, default_value_t = false)]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct TemplateArgs {
    #[arg(long)]
    pub standard_id: u64,

    #[arg(long = "type", value_enum)]
    pub template_type: TemplateType,

    #[arg(long)]
    pub grade: u32,

    #[arg(long, value_enum)]
    pub ela_type: ElaStandardType,

    /// Código do standard, ex.: RI.7.1
    #[arg(long)]
    pub ela_code: String,

    #[arg(long, value_enum, default_value_t = WorldviewFlag::Neutral)]
    pub worldview: WorldviewFlag,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Acompanha o job até terminar.
    #[arg(long, default_value_t = false)]
    pub wait: bool,
}

#[derive(Debug, Args)]
pub struct RegionArgs {
    #[arg(long, value_enum)]
    pub locale: Option<Locale>,

    #[arg(long, value_enum)]
    pub curriculum: Option<Curriculum>,
}

/// Paginação comum às listagens.
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Página, começando em 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Itens por página (padrão: page_size da configuração).
    #[arg(long)]
    pub limit: Option<u32>,

    /// Deslocamento absoluto; alternativa a --page.
    #[arg(long, conflicts_with = "page")]
    pub offset: Option<u64>,
}

impl PageArgs {
    /// Página pedida. Um `--offset` fora do múltiplo do limite é recusado,
    /// pois as listagens só endereçam páginas inteiras.
    pub fn request(&self, default_limit: u32) -> Result<PageRequest, RequestError> {
        let limit = self.limit.unwrap_or(default_limit);
        match self.offset {
            Some(offset) => {
                let request = PageRequest::from_offset(offset, limit);
                if request.offset() != offset {
                    return Err(RequestError::MisalignedOffset {
                        offset,
                        limit: request.limit(),
                    });
                }
                Ok(request)
            }
            None => Ok(PageRequest::new(self.page, limit)),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    List {
        #[arg(long, value_enum)]
        status: Option<JobStatus>,

        #[command(flatten)]
        page: PageArgs,
    },

    Show {
        id: ResourceId,
    },

    /// Acompanha um job até COMPLETED ou FAILED.
    Watch {
        id: ResourceId,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProductsCommand {
    List {
        #[arg(long, value_enum)]
        status: Option<ProductStatus>,

        /// product_type ou template_type, ex.: WORKSHEET
        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        standard_id: Option<u64>,

        /// Only products of this generation job.
        #[arg(long)]
        job: Option<ResourceId>,

        #[arg(long)]
        grade: Option<u32>,

        #[arg(long, value_enum)]
        worldview: Option<WorldviewFlag>,

        #[arg(long, value_enum)]
        ela_type: Option<ElaStandardType>,

        #[arg(long, value_enum)]
        curriculum: Option<Curriculum>,

        #[command(flatten)]
        page: PageArgs,
    },

    Show {
        id: ResourceId,
    },

    /// Imprime o JSON gerado do produto.
    Content {
        id: ResourceId,
    },

    SetStatus {
        id: ResourceId,

        #[arg(value_enum)]
        status: ProductStatus,
    },
}

#[derive(Debug, Subcommand)]
pub enum UploadsCommand {
    List {
        #[arg(long, value_enum)]
        status: Option<UploadStatus>,

        #[arg(long)]
        assignee: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    Show {
        id: ResourceId,
    },
}

#[derive(Debug, Subcommand)]
pub enum StandardsCommand {
    Lookup {
        /// Standard code or prefix, e.g. RI.7
        code: Option<String>,

        #[arg(long)]
        grade: Option<u32>,

        #[arg(long)]
        curriculum: Option<String>,

        #[arg(long)]
        limit: Option<u32>,
    },

    Show {
        id: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_generate_product() {
        let cli = Cli::parse_from([
            "genboard",
            "generate",
            "product",
            "--standard-id",
            "12",
            "--type",
            "worksheet",
            "--grade",
            "5",
            "--locale",
            "in",
            "--curriculum",
            "cbse",
            "--wait",
        ]);
        match cli.command {
            Command::Generate {
                target: GenerateCommand::Product(args),
            } => {
                assert_eq!(args.standard_id, 12);
                assert_eq!(args.product_type, ProductType::Worksheet);
                assert_eq!(args.region.locale, Some(Locale::In));
                assert_eq!(args.region.curriculum, Some(Curriculum::Cbse));
                assert!(args.wait);
            }
            _ => panic!("expected generate product"),
        }
    }

    #[test]
    fn cli_parses_generate_template() {
        let cli = Cli::parse_from([
            "genboard",
            "generate",
            "template",
            "--standard-id",
            "4",
            "--type",
            "vocabulary-pack",
            "--grade",
            "7",
            "--ela-type",
            "ri",
            "--ela-code",
            "RI.7.1",
        ]);
        match cli.command {
            Command::Generate {
                target: GenerateCommand::Template(args),
            } => {
                assert_eq!(args.template_type, TemplateType::VocabularyPack);
                assert_eq!(args.ela_type, ElaStandardType::Ri);
                assert_eq!(args.worldview, WorldviewFlag::Neutral);
                assert!(!args.wait);
            }
            _ => panic!("expected generate template"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "genboard",
            "--base-url",
            "https://content.example.org/api",
            "--api-version",
            "legacy",
            "--json",
            "health",
            "--verbose",
        ]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.api_version, Some(ApiVersion::Legacy));
        assert_eq!(cli.base_url.as_deref(), Some("https://content.example.org/api"));
        assert!(matches!(cli.command, Command::Health));
    }

    #[test]
    fn cli_parses_product_filters() {
        let cli = Cli::parse_from([
            "genboard", "products", "list", "--status", "generated", "--job", "77", "--limit",
            "50", "--ela-type", "rl", "--curriculum", "common-core",
        ]);
        match cli.command {
            Command::Products {
                command:
                    ProductsCommand::List {
                        status,
                        job,
                        ela_type,
                        curriculum,
                        page,
                        ..
                    },
            } => {
                assert_eq!(status, Some(ProductStatus::Generated));
                assert_eq!(ela_type, Some(ElaStandardType::Rl));
                assert_eq!(curriculum, Some(Curriculum::CommonCore));
                assert_eq!(job, Some(ResourceId::from("77")));
                let request = page.request(20).unwrap();
                assert_eq!(request.limit(), 50);
                assert_eq!(request.page(), 1);
            }
            _ => panic!("expected products list"),
        }
    }

    #[test]
    fn offset_maps_to_page() {
        let cli = Cli::parse_from(["genboard", "uploads", "list", "--offset", "40"]);
        match cli.command {
            Command::Uploads {
                command: UploadsCommand::List { page, .. },
            } => {
                let request = page.request(20).unwrap();
                assert_eq!(request.page(), 3);
                assert_eq!(request.offset(), 40);
            }
            _ => panic!("expected uploads list"),
        }
    }

    #[test]
    fn misaligned_offset_is_rejected() {
        let cli = Cli::parse_from([
            "genboard", "products", "list", "--offset", "45", "--limit", "20",
        ]);
        match cli.command {
            Command::Products {
                command: ProductsCommand::List { page, .. },
            } => {
                assert_eq!(
                    page.request(20).unwrap_err(),
                    RequestError::MisalignedOffset {
                        offset: 45,
                        limit: 20
                    }
                );
            }
            _ => panic!("expected products list"),
        }
    }

    #[test]
    fn page_and_offset_conflict() {
        let res = Cli::try_parse_from([
            "genboard", "jobs", "list", "--page", "2", "--offset", "40",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn set_status_takes_positional_status() {
        let cli = Cli::parse_from(["genboard", "products", "set-status", "12", "published"]);
        match cli.command {
            Command::Products {
                command: ProductsCommand::SetStatus { id, status },
            } => {
                assert_eq!(id.as_str(), "12");
                assert_eq!(status, ProductStatus::Published);
            }
            _ => panic!("expected set-status"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
